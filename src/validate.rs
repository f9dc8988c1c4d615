use crate::data::RawClue;

/// Keeps usable clues and drops repeated questions.
///
/// A clue is usable when its question is not blank and it carries no
/// `invalid_count`. Among clues sharing a question only the first is kept,
/// and survivors stay in source order. Duplicates are found by scanning the
/// output itself, so nothing is allocated besides the returned vector.
pub fn filter_valid(clues: &[RawClue]) -> Vec<&RawClue> {
    let mut kept: Vec<&RawClue> = Vec::with_capacity(clues.len());
    for clue in clues {
        if clue.question.trim().is_empty() || clue.is_flagged() {
            continue;
        }
        if kept.iter().any(|seen| seen.question == clue.question) {
            continue;
        }
        kept.push(clue);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clue(id: u64, question: &str) -> RawClue {
        RawClue {
            id: Some(id),
            question: question.to_string(),
            answer: format!("answer {id}"),
            value: Some(200),
            invalid_count: None,
        }
    }

    #[test]
    fn first_duplicate_wins_and_order_is_kept() {
        let clues = vec![clue(1, "A"), clue(2, "B"), clue(3, "A")];
        let kept: Vec<_> = filter_valid(&clues).iter().map(|c| c.id).collect();
        assert_eq!(kept, vec![Some(1), Some(2)]);
    }

    #[test]
    fn drops_blank_and_flagged_clues() {
        let mut flagged = clue(2, "flagged");
        flagged.invalid_count = Some(1);
        let mut zero_flag = clue(4, "zero flag");
        zero_flag.invalid_count = Some(0);
        let clues = vec![clue(1, ""), flagged, clue(3, "   "), zero_flag, clue(5, "ok")];
        let kept: Vec<_> = filter_valid(&clues).iter().map(|c| c.id).collect();
        assert_eq!(kept, vec![Some(5)]);
    }

    #[test]
    fn flagged_first_occurrence_does_not_shadow_a_valid_duplicate() {
        let mut flagged = clue(1, "same");
        flagged.invalid_count = Some(2);
        let clues = vec![flagged, clue(2, "same")];
        let kept: Vec<_> = filter_valid(&clues).iter().map(|c| c.id).collect();
        assert_eq!(kept, vec![Some(2)]);
    }

    #[test]
    fn empty_input() {
        assert!(filter_valid(&[]).is_empty());
    }
}
