//! Calculator extension for evaluating math expressions

use crate::core::{Action, Extension, Item, QueryHandle, MAX_SCORE};
use crate::executor::ExecutionAction;

/// Evaluate a math expression and return the result
/// Returns None if the expression is invalid or not a math expression
pub fn evaluate(expr: &str) -> Option<f64> {
    let expr = expr.trim();

    // Skip if empty or doesn't look like math
    if expr.is_empty() {
        return None;
    }

    // Must contain at least one digit
    if !expr.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // Try to evaluate using meval
    match meval::eval_str(expr) {
        Ok(result) => {
            // Filter out NaN and infinity
            if result.is_finite() {
                Some(result)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Format a result for display
/// Removes unnecessary decimal places (e.g., 4.0 -> "4")
/// Limits precision to 10 decimal places
pub fn format_result(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e12 {
        format!("{}", value as i64)
    } else {
        let formatted = format!("{:.10}", value);
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Answers any untriggered input that evaluates to a number.
#[derive(Debug, Default)]
pub struct CalculatorExtension;

impl CalculatorExtension {
    pub const ID: &'static str = "calculator";

    pub fn new() -> Self {
        Self
    }
}

impl Extension for CalculatorExtension {
    fn id(&self) -> &str {
        Self::ID
    }

    fn handle_query(&self, query: &QueryHandle) {
        let expr = query.search_term().trim();
        let Some(value) = evaluate(expr) else {
            return;
        };
        // A bare number is not worth a result.
        if expr.parse::<f64>().is_ok() {
            return;
        }

        let result = format_result(value);
        // Results change with every input; never track them.
        let item = Item::new("", result.clone())
            .with_subtext(format!("Result of {}", expr))
            .with_completion(format!("={}", result))
            .with_action(Action::new(
                "Copy to clipboard",
                ExecutionAction::CopyToClipboard {
                    content: result.clone(),
                    notification: format!("Copied {}", result),
                },
            ));
        query.add_match(item.into_shared(), MAX_SCORE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_math() {
        assert_eq!(evaluate("2+2"), Some(4.0));
        assert_eq!(evaluate("10 - 3"), Some(7.0));
        assert_eq!(evaluate("5 * 6"), Some(30.0));
        assert_eq!(evaluate("20 / 4"), Some(5.0));
    }

    #[test]
    fn test_complex_expressions() {
        assert_eq!(evaluate("2^10"), Some(1024.0));
        assert_eq!(evaluate("sqrt(16)"), Some(4.0));
        assert_eq!(evaluate("(10 + 5) * 2"), Some(30.0));
    }

    #[test]
    fn test_invalid_expressions() {
        assert_eq!(evaluate("hello"), None);
        assert_eq!(evaluate(""), None);
        assert_eq!(evaluate("abc + def"), None);
        assert_eq!(evaluate("1/0"), None);
    }

    #[test]
    fn test_format_result() {
        assert_eq!(format_result(4.0), "4");
        assert_eq!(format_result(1.23456), "1.23456");
        assert_eq!(format_result(100.0), "100");
        assert_eq!(format_result(1.0 / 3.0), "0.3333333333");
    }

    #[test]
    fn test_extension_adds_result() {
        let query = QueryHandle::detached("(10 + 5) * 2");
        CalculatorExtension::new().handle_query(&query);

        let matches = query.snapshot();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].item.text, "30");
        assert_eq!(matches[0].score, MAX_SCORE);
        assert!(!matches[0].item.is_tracked());
        assert_eq!(
            matches[0].item.default_action(),
            Some(&ExecutionAction::CopyToClipboard {
                content: "30".into(),
                notification: "Copied 30".into(),
            })
        );
    }

    #[test]
    fn test_extension_ignores_non_math() {
        let calc = CalculatorExtension::new();
        for input in ["firefox", "42", ""] {
            let query = QueryHandle::detached(input);
            calc.handle_query(&query);
            assert_eq!(query.size(), 0, "input {:?}", input);
        }
    }
}
