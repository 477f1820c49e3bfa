use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::UnknownProvider;

/// External text-generation service a prompt is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[serde(alias = "openAI", alias = "OpenAI")]
    Openai,
    Gemini,
    #[serde(alias = "anthropic")]
    Claude,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Openai, Provider::Gemini, Provider::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Openai => "openai",
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::Openai),
            "gemini" => Ok(Provider::Gemini),
            "claude" | "anthropic" => Ok(Provider::Claude),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Which provider and model an analysis runs against. An empty or missing
/// model means "the provider's default model".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    pub provider: Provider,
    pub model: Option<String>,
}

impl ModelSelection {
    pub fn new(provider: Provider, model: Option<String>) -> Self {
        Self { provider, model }.normalized()
    }

    /// Drops blank model names so they fall back to the provider default.
    pub fn normalized(mut self) -> Self {
        self.model = self
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        self
    }
}

/// Named analysis flags. Unknown keys in incoming payloads are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub architecture: bool,
    pub security: bool,
    pub performance: bool,
    pub testing: bool,
    pub style: bool,
    pub dependencies: bool,
}

impl AnalysisOptions {
    pub fn get(&self, name: &str) -> Option<bool> {
        match name {
            "architecture" => Some(self.architecture),
            "security" => Some(self.security),
            "performance" => Some(self.performance),
            "testing" => Some(self.testing),
            "style" => Some(self.style),
            "dependencies" => Some(self.dependencies),
            _ => None,
        }
    }

    /// Sets a flag by name; returns false for names outside the registry.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        let slot = match name {
            "architecture" => &mut self.architecture,
            "security" => &mut self.security,
            "performance" => &mut self.performance,
            "testing" => &mut self.testing,
            "style" => &mut self.style,
            "dependencies" => &mut self.dependencies,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Parses an options payload that may arrive as a JSON-encoded string
    /// (multipart forms) or be absent. Blank input yields all flags off.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::default());
        }
        serde_json::from_str(trimmed)
    }
}

/// Input to a persisted analysis, before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysis {
    pub input_text: String,
    pub result_text: String,
    pub options: AnalysisOptions,
    pub user_instruction: String,
    pub model_selection: ModelSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub input_text: String,
    pub result_text: String,
    pub options: AnalysisOptions,
    pub user_instruction: String,
    pub model_selection: ModelSelection,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AnalysisRecord {
    pub fn from_new(id: String, created_at: OffsetDateTime, new: NewAnalysis) -> Self {
        Self {
            id,
            input_text: new.input_text,
            result_text: new.result_text,
            options: new.options,
            user_instruction: new.user_instruction,
            model_selection: new.model_selection,
            created_at,
        }
    }
}

/// One analysis request as it enters the pipeline.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub input_text: String,
    pub options: AnalysisOptions,
    pub user_instruction: String,
    pub model_selection: ModelSelection,
}

impl AnalysisRequest {
    /// Pairs this request with the generated result for persistence. The
    /// original input is stored, never the chunk summaries.
    pub fn into_new_analysis(self, result_text: String) -> NewAnalysis {
        NewAnalysis {
            input_text: self.input_text,
            result_text,
            options: self.options,
            user_instruction: self.user_instruction,
            model_selection: self.model_selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_aliases() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::Openai);
        assert_eq!("anthropic".parse::<Provider>().unwrap(), Provider::Claude);
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn model_selection_defaults_to_openai() {
        let sel: ModelSelection = serde_json::from_str("{}").unwrap();
        assert_eq!(sel.provider, Provider::Openai);
        assert_eq!(sel.model, None);

        let sel: ModelSelection =
            serde_json::from_str(r#"{"provider":"claude","model":"  "}"#).unwrap();
        assert_eq!(sel.normalized().model, None);
    }

    #[test]
    fn options_ignore_unknown_keys() {
        let opts: AnalysisOptions =
            serde_json::from_str(r#"{"security":true,"colour":true}"#).unwrap();
        assert!(opts.security);
        assert!(!opts.performance);
    }

    #[test]
    fn options_from_json_string() {
        assert_eq!(
            AnalysisOptions::from_json_str("").unwrap(),
            AnalysisOptions::default()
        );
        let opts = AnalysisOptions::from_json_str(r#"{"testing":true}"#).unwrap();
        assert!(opts.testing);
        assert!(AnalysisOptions::from_json_str("{not json").is_err());
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = AnalysisRecord::from_new(
            "id-1".into(),
            OffsetDateTime::UNIX_EPOCH,
            NewAnalysis {
                input_text: "a".into(),
                result_text: "b".into(),
                options: AnalysisOptions::default(),
                user_instruction: String::new(),
                model_selection: ModelSelection::default(),
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["inputText"], "a");
        assert_eq!(json["resultText"], "b");
        assert_eq!(json["modelSelection"]["provider"], "openai");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
    }
}
