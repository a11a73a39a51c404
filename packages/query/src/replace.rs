//! Evaluation and application of replacement assignments.

use crate::ast::{Assignment, RefField, Relation, Target, ValueExpr};
use crate::error::EvalError;
use crate::eval::neighbour;
use treebank_conllu::{Field, Sentence, Token, TokenRef};

impl ValueExpr {
    /// Computes the value for `token`.
    pub fn evaluate(&self, sentence: &Sentence, token: &Token) -> Result<String, EvalError> {
        match self {
            ValueExpr::Literal(text) => Ok(text.clone()),
            ValueExpr::Field { hops, field } => {
                let mut current = token;
                for _ in 0..*hops {
                    current = neighbour(sentence, current, Relation::Head)
                        .ok_or(EvalError::NoHead { token: current.id })?;
                }
                Ok(read_or_blank(field, current))
            }
            ValueExpr::Concat(parts) => parts
                .iter()
                .map(|part| part.evaluate(sentence, token))
                .collect(),
            ValueExpr::Upper(inner) => Ok(inner.evaluate(sentence, token)?.to_uppercase()),
            ValueExpr::Lower(inner) => Ok(inner.evaluate(sentence, token)?.to_lowercase()),
            ValueExpr::Cap(inner) => {
                let value = inner.evaluate(sentence, token)?;
                let mut chars = value.chars();
                Ok(match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => value,
                })
            }
            ValueExpr::Substring(inner, start, end) => {
                let value = inner.evaluate(sentence, token)?;
                let length = value.chars().count();
                let end = end.unwrap_or(length);
                if *start > end || end > length {
                    return Ok(value);
                }
                Ok(value.chars().skip(*start).take(end - start).collect())
            }
            ValueExpr::Replace(inner, regex, replacement) => {
                let value = inner.evaluate(sentence, token)?;
                Ok(regex.replace_all(&value, replacement.as_str()).into_owned())
            }
        }
    }
}

/// Absent features and misc entries read as an empty string.
fn read_or_blank(field: &RefField, token: &Token) -> String {
    field.read(token).unwrap_or_default()
}

/// Applies `assignments` to one token. Every value is computed before the
/// first write, so `form:this(Lemma) lemma:this(Form)` swaps the two.
///
/// Returns whether the token changed; problems go to `warnings`.
pub fn apply_assignments(
    sentence: &mut Sentence,
    id: TokenRef,
    assignments: &[Assignment],
    warnings: &mut Vec<EvalError>,
) -> bool {
    let Some(token) = sentence.get(id) else {
        return false;
    };
    let mut values = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        match assignment.value.evaluate(sentence, token) {
            Ok(value) => values.push((&assignment.target, value)),
            Err(err) => warnings.push(err),
        }
    }

    let mut changed = false;
    for (target, value) in values {
        let result = match target {
            Target::Feat(key) => sentence.add_feature(id, &format!("{}={}", key, value)),
            Target::Misc(key) => sentence.add_misc(id, &format!("{}={}", key, value)),
            column => {
                if value.is_empty() {
                    warnings.push(EvalError::EmptyValue {
                        token: id,
                        field: column.to_string(),
                    });
                    continue;
                }
                let field = match column {
                    Target::Form => Field::Form,
                    Target::Lemma => Field::Lemma,
                    Target::Upos => Field::Upos,
                    Target::Xpos => Field::Xpos,
                    _ => Field::Deprel,
                };
                sentence.set_field(id, &field, &value)
            }
        };
        match result {
            Ok(modified) => changed |= modified,
            Err(source) => warnings.push(EvalError::Edit { token: id, source }),
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_replacement;
    use treebank_conllu::parse_sentence;

    const SENTENCE: &str = "1\tthe\tthe\tDET\t_\t_\t2\tdet\t_\t_\n\
2\tcats\tcat\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_\n\
3\tsleep\tsleep\tVERB\t_\t_\t0\troot\t_\t_\n";

    fn run(replacement: &str, id: u32) -> (Sentence, Vec<EvalError>, bool) {
        let mut sentence = parse_sentence(SENTENCE).unwrap();
        let assignments = parse_replacement(replacement).unwrap();
        let mut warnings = Vec::new();
        let changed = apply_assignments(
            &mut sentence,
            TokenRef::Ordinary(id),
            &assignments,
            &mut warnings,
        );
        (sentence, warnings, changed)
    }

    #[test]
    fn test_functions() {
        let (sentence, warnings, changed) = run(
            "lemma:upper(this(Form))+\"-\"+head(Lemma) misc:Stem=substring(this(Form),0,3) xpos:cap(replace(this(Lemma),\"t$\",\"ts\"))",
            2,
        );
        assert!(changed);
        assert!(warnings.is_empty());
        let token = sentence.token(2).unwrap();
        assert_eq!(token.lemma, "CATS-sleep");
        assert_eq!(token.misc_value("Stem"), Some("cat"));
        assert_eq!(token.xpos, "Cats");
    }

    #[test]
    fn test_values_computed_before_writing() {
        let (sentence, _, _) = run("form:this(Upos) upos:this(Form)", 1);
        let token = sentence.token(1).unwrap();
        assert_eq!(token.form, "DET");
        assert_eq!(token.upos, "the");
    }

    #[test]
    fn test_substring_out_of_range_keeps_value() {
        let (sentence, _, _) = run("lemma:substring(this(Form),2,10)", 2);
        assert_eq!(sentence.token(2).unwrap().lemma, "cats");
    }

    #[test]
    fn test_empty_feature_removes_key() {
        let (sentence, _, changed) = run("feat:Number=", 2);
        assert!(changed);
        assert_eq!(sentence.token(2).unwrap().feats_string(), "_");
    }

    #[test]
    fn test_missing_head_is_a_warning() {
        let (sentence, warnings, changed) = run("lemma:head(Lemma) upos:X", 3);
        assert!(changed);
        assert_eq!(
            warnings,
            vec![EvalError::NoHead {
                token: TokenRef::Ordinary(3)
            }]
        );
        assert_eq!(sentence.token(3).unwrap().lemma, "sleep");
    }

    #[test]
    fn test_empty_column_value_is_a_warning() {
        let (_, warnings, changed) = run("lemma:this(Feat_Gender)", 2);
        assert!(!changed);
        assert!(matches!(warnings[0], EvalError::EmptyValue { .. }));
    }
}
