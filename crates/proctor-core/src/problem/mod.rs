//! Coding problems and their test fixtures.
//!
//! A session is bound to one problem for its whole lifetime. The fixture is
//! a JavaScript harness appended to the candidate's solution before it is
//! sent to the sandbox; it prints `"<passed>/<total> tests passed"` and
//! exits non-zero when any test fails.

mod builtin;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A worked example shown to the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemExample {
    pub input: String,
    pub output: String,
    pub explanation: String,
}

/// A coding problem with its starter code and test harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub difficulty: String,
    pub description: String,
    pub initial_code: String,
    /// Name of the function the harness calls.
    pub export_name: String,
    pub test_fixture: String,
    pub examples: Vec<ProblemExample>,
    pub constraints: Vec<String>,
    pub hints: Vec<String>,
}

impl Problem {
    /// Candidate code followed by the test harness, ready for the sandbox.
    pub fn build_submission(&self, solution: &str) -> String {
        format!("// Solution\n{}\n\n// Tests\n{}\n", solution, self.test_fixture)
    }

    /// Opening assistant message for a freshly created session.
    pub fn welcome_message(&self, candidate_name: &str) -> String {
        let examples = self
            .examples
            .iter()
            .map(|ex| {
                format!(
                    "- Input: {}\n  Output: {}\n  ({})",
                    ex.input, ex.output, ex.explanation
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let constraints = self
            .constraints
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Hello {name}! 👋\n\n\
             I'm your AI interviewer today. Here's your coding challenge:\n\n\
             **{title}** ({difficulty})\n\n\
             {description}\n\n\
             **Examples:**\n{examples}\n\n\
             **Constraints:**\n{constraints}\n\n\
             Feel free to ask me any clarifying questions! When you're ready, write your \
             solution in the editor and click \"Run Code\" to test it.\n\nGood luck! 🚀",
            name = candidate_name,
            title = self.title,
            difficulty = capitalize(&self.difficulty),
            description = self.description,
            examples = examples,
            constraints = constraints,
        )
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lookup table of available problems.
#[derive(Debug, Clone)]
pub struct ProblemCatalog {
    problems: BTreeMap<String, Problem>,
}

impl ProblemCatalog {
    /// Catalog with the built-in problem set.
    pub fn builtin() -> Self {
        Self::from_problems(builtin::problems())
    }

    pub fn from_problems(problems: impl IntoIterator<Item = Problem>) -> Self {
        Self {
            problems: problems.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, problem_id: &str) -> Option<&Problem> {
        self.problems.get(problem_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.problems.keys().map(String::as_str)
    }
}

impl Default for ProblemCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_contents() {
        let catalog = ProblemCatalog::builtin();
        let ids: Vec<_> = catalog.ids().collect();
        assert_eq!(
            ids,
            vec![
                "maximum-subarray",
                "merge-sorted-arrays",
                "reverse-string",
                "two-sum",
                "valid-palindrome",
            ]
        );
    }

    #[test]
    fn test_every_fixture_reports_totals() {
        let catalog = ProblemCatalog::builtin();
        for id in catalog.ids() {
            let problem = catalog.get(id).unwrap();
            assert!(problem.test_fixture.contains("tests passed"), "{id}");
            assert!(problem.test_fixture.contains(&problem.export_name), "{id}");
            assert!(problem.initial_code.contains(&problem.export_name), "{id}");
        }
    }

    #[test]
    fn test_submission_places_solution_before_tests() {
        let catalog = ProblemCatalog::builtin();
        let problem = catalog.get("two-sum").unwrap();
        let submission = problem.build_submission("function twoSum() {}");
        let solution_at = submission.find("function twoSum() {}").unwrap();
        let tests_at = submission.find("// Tests").unwrap();
        assert!(solution_at < tests_at);
    }

    #[test]
    fn test_welcome_message_mentions_candidate_and_problem() {
        let catalog = ProblemCatalog::builtin();
        let message = catalog.get("two-sum").unwrap().welcome_message("Ada");
        assert!(message.starts_with("Hello Ada!"));
        assert!(message.contains("**Two Sum** (Easy)"));
        assert!(message.contains("You cannot use the same element twice"));
    }
}
