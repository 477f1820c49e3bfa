//! Prompt templates sent to the model.
//!
//! Rendering is deterministic: identical inputs give byte-identical prompts.

use crate::types::AnalysisOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Short per-chunk summary used when an input is too large for one call.
    Summarize,
    /// Full structured report.
    #[default]
    Analysis,
}

/// Option flag registry, in the order the lines appear in the prompt.
pub const OPTION_REGISTRY: &[(&str, &str)] = &[
    (
        "architecture",
        "- Explain the architectural patterns and the dependency structure.",
    ),
    (
        "security",
        "- Point out potential security vulnerabilities and how to fix them.",
    ),
    (
        "performance",
        "- Suggest areas where performance can be optimized and how.",
    ),
    (
        "testing",
        "- Find missing tests and propose test cases ordered by priority.",
    ),
    (
        "style",
        "- Point out code style and lint problems with example automatic fixes.",
    ),
    (
        "dependencies",
        "- Analyze dependency management, version compatibility and unnecessary libraries.",
    ),
];

const ANALYSIS_HEADER: &str = "You are a code analysis expert. Analyze the attached code and explain the following:
## 1. Project Overview
 - The purpose and role of this code
 - Main use cases

## 2. Technology Stack
 - Languages, frameworks and libraries used
 - Key dependencies

## 3. Key Features
 - Core features (as a list)
 - How each feature works

## 4. Folder/File Responsibilities
 - The role of each directory and file
 - How the modules relate to each other

## 5. Core Logic
 - The most important algorithms or business logic
 - Explanations of the complex parts

 Concrete, easy-to-follow examples are welcome.
";

const SUMMARIZE_HEADER: &str = "You are a code summarization expert. Summarize the code below briefly. Include only its main purpose, the technologies used, the key functions/modules, and problems found (if any, in one or two sentences). Write the output as concise plain text.";

const OPTIONS_HEADER: &str = "\n[Additional analysis requests]\n";

const USER_PROMPT_HEADER: &str = "\n[Additional user request]\n";

const OUTPUT_CONTRACT: &str = "\n[Output format requirements]\n1) First provide a Markdown report with these sections: Short Summary, Tech Stack, Key Functionality, File Roles, Key Logic, Issues & Recommendations, Next Steps.\n2) Then, starting on a new line, output exactly one JSON object. It must contain these keys (required): {\"summary\":\"short text\",\"techStack\":[],\"files\":[],\"issues\":[],\"recommendations\":[]} Each issue entry must have the shape {\"id\",\"type\",\"severity\",\"location\":{\"file\",\"line\"},\"description\",\"suggestedFix\",\"patch\"}. Do not write any text after the JSON object.";

const CODE_HEADER: &str = "[Code]\n";

/// Renders the prompt for `code` in the given mode.
pub fn build_prompt(
    code: &str,
    options: &AnalysisOptions,
    user_instruction: &str,
    mode: PromptMode,
) -> String {
    match mode {
        PromptMode::Summarize => format!("{SUMMARIZE_HEADER}\n\n{CODE_HEADER}{code}"),
        PromptMode::Analysis => {
            let mut out = String::with_capacity(ANALYSIS_HEADER.len() + code.len() + 2048);
            out.push_str(ANALYSIS_HEADER);

            out.push_str(OPTIONS_HEADER);
            for line in enabled_option_lines(options) {
                out.push_str(line);
                out.push('\n');
            }

            if !user_instruction.trim().is_empty() {
                out.push_str(USER_PROMPT_HEADER);
                out.push_str(user_instruction);
                out.push('\n');
            }

            out.push_str(OUTPUT_CONTRACT);
            out.push('\n');
            out.push_str(CODE_HEADER);
            out.push_str(code);
            out
        }
    }
}

/// Instruction lines for every enabled flag, in registry order.
pub fn enabled_option_lines(options: &AnalysisOptions) -> impl Iterator<Item = &'static str> + '_ {
    OPTION_REGISTRY
        .iter()
        .filter(|(name, _)| options.get(name).unwrap_or(false))
        .map(|(_, line)| *line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str) -> &'static str {
        OPTION_REGISTRY
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, l)| *l)
            .unwrap()
    }

    #[test]
    fn summarize_mode_skips_structured_report() {
        let prompt = build_prompt(
            "fn main() {}",
            &AnalysisOptions {
                security: true,
                ..Default::default()
            },
            "focus on errors",
            PromptMode::Summarize,
        );
        assert!(!prompt.contains("## 1. Project Overview"));
        assert!(!prompt.contains("## 5. Core Logic"));
        assert!(!prompt.contains(line("security")));
        assert!(prompt.ends_with("[Code]\nfn main() {}"));
    }

    #[test]
    fn analysis_mode_includes_only_enabled_flags() {
        let options = AnalysisOptions {
            security: true,
            performance: false,
            ..Default::default()
        };
        let prompt = build_prompt("x", &options, "", PromptMode::Analysis);
        assert!(prompt.contains(line("security")));
        assert!(!prompt.contains(line("performance")));
        assert!(!prompt.contains("[Additional user request]"));
    }

    #[test]
    fn enabled_flags_follow_registry_order() {
        let options = AnalysisOptions {
            dependencies: true,
            architecture: true,
            testing: true,
            ..Default::default()
        };
        let prompt = build_prompt("x", &options, "", PromptMode::Analysis);
        let arch = prompt.find(line("architecture")).unwrap();
        let testing = prompt.find(line("testing")).unwrap();
        let deps = prompt.find(line("dependencies")).unwrap();
        assert!(arch < testing && testing < deps);
    }

    #[test]
    fn user_instruction_echoed_verbatim() {
        let prompt = build_prompt(
            "x",
            &AnalysisOptions::default(),
            "  Explain the *parser*  ",
            PromptMode::Analysis,
        );
        assert!(prompt.contains("[Additional user request]\n  Explain the *parser*  \n"));

        let blank = build_prompt("x", &AnalysisOptions::default(), "   ", PromptMode::Analysis);
        assert!(!blank.contains("[Additional user request]"));
    }

    #[test]
    fn output_contract_precedes_code() {
        let prompt = build_prompt(
            "console.log(1)",
            &AnalysisOptions::default(),
            "",
            PromptMode::Analysis,
        );
        let contract = prompt.find("[Output format requirements]").unwrap();
        let code = prompt.find("[Code]\nconsole.log(1)").unwrap();
        assert!(contract < code);
        assert!(prompt.ends_with("console.log(1)"));
        for key in ["summary", "techStack", "files", "issues", "recommendations"] {
            assert!(prompt.contains(&format!("\"{key}\"")));
        }
        assert!(prompt.contains("Do not write any text after the JSON object."));
    }

    #[test]
    fn rendering_is_deterministic() {
        let options = AnalysisOptions {
            style: true,
            ..Default::default()
        };
        let a = build_prompt("abc", &options, "note", PromptMode::Analysis);
        let b = build_prompt("abc", &options, "note", PromptMode::Analysis);
        assert_eq!(a, b);
    }
}
