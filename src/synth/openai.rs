use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};

use super::document::PolicyDocument;
use super::{GeneratedPolicy, PolicyRequest, PolicySynthesizer, SynthError};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const HTTP_TIMEOUT_SECONDS: u64 = 90;
const TEMPERATURE: f64 = 0.1;
const SYSTEM_PROMPT: &str = "You are an assistant that produces AWS IAM identity policies as JSON. \
Grant only the actions the request needs and never use a Principal element.";

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Generates policies with the OpenAI chat completions API using a JSON
/// schema response format.
pub struct OpenAiSynthesizer {
    api_key: Option<String>,
    model: String,
}

impl OpenAiSynthesizer {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
        }
    }

    fn payload(&self, request: &PolicyRequest) -> Value {
        json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": request.prompt() },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": policy_schema(),
            },
        })
    }
}

impl PolicySynthesizer for OpenAiSynthesizer {
    fn generate(&self, request: &PolicyRequest) -> Result<GeneratedPolicy, SynthError> {
        if request.description.trim().is_empty() {
            return Err(SynthError::EmptyDescription);
        }
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(SynthError::MissingApiKey)?;

        debug!("Requesting policy from {} using model {}", CHAT_COMPLETIONS_URL, self.model);

        let agent = ureq::Agent::config_builder()
            .timeout_per_call(Some(Duration::from_secs(HTTP_TIMEOUT_SECONDS)))
            .http_status_as_error(false)
            .user_agent(format!("targe/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .new_agent();

        let mut response = agent
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .send(self.payload(request).to_string())
            .map_err(|err| SynthError::Http(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| SynthError::Http(err.to_string()))?;

        if status != 200 {
            return Err(SynthError::Status { status, body });
        }

        let document = parse_completion(&body)?;
        GeneratedPolicy::from_document(&request.description, document)
    }
}

fn parse_completion(body: &str) -> Result<PolicyDocument, SynthError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(SynthError::EmptyResponse)?;

    Ok(serde_json::from_str(&content)?)
}

fn string_or_list() -> Value {
    json!({
        "oneOf": [
            { "type": "string" },
            { "type": "array", "items": { "type": "string" } },
        ]
    })
}

fn policy_schema() -> Value {
    json!({
        "name": "IAMPolicy",
        "schema": {
            "type": "object",
            "properties": {
                "Version": { "type": "string", "enum": ["2012-10-17"] },
                "Id": { "type": "string" },
                "Statement": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "Sid": { "type": "string" },
                            "Effect": { "type": "string", "enum": ["Allow", "Deny"] },
                            "Action": string_or_list(),
                            "NotAction": string_or_list(),
                            "Resource": string_or_list(),
                            "NotResource": string_or_list(),
                        },
                        "required": ["Effect"],
                    },
                },
            },
            "required": ["Version", "Statement"],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: &str) -> String {
        json!({ "choices": [ { "message": { "content": content } } ] }).to_string()
    }

    #[test]
    fn parses_policy_from_message_content() {
        let body = completion(
            r#" {"Version":"2012-10-17","Id":"ReadLogs","Statement":[{"Effect":"Allow","Action":"logs:GetLogEvents","Resource":"*"}]} "#,
        );

        let document = parse_completion(&body).unwrap();
        assert_eq!(document.id.as_deref(), Some("ReadLogs"));
        assert_eq!(document.statement.len(), 1);
    }

    #[test]
    fn empty_choices_are_reported() {
        let result = parse_completion(r#"{"choices": []}"#);
        assert!(matches!(result, Err(SynthError::EmptyResponse)));
    }

    #[test]
    fn blank_content_is_reported() {
        let result = parse_completion(&completion("   "));
        assert!(matches!(result, Err(SynthError::EmptyResponse)));
    }

    #[test]
    fn unparseable_content_is_reported() {
        let result = parse_completion(&completion("not a policy"));
        assert!(matches!(result, Err(SynthError::InvalidContent(_))));
    }

    #[test]
    fn missing_api_key_fails_before_any_request() {
        let synthesizer = OpenAiSynthesizer::new(None, "gpt-4o");
        let request = PolicyRequest {
            description: "read logs".to_string(),
            service: None,
            resource_arn: None,
        };

        assert!(matches!(synthesizer.generate(&request), Err(SynthError::MissingApiKey)));
    }

    #[test]
    fn empty_description_is_rejected() {
        let synthesizer = OpenAiSynthesizer::new(Some("key".to_string()), "gpt-4o");
        let request = PolicyRequest {
            description: "  ".to_string(),
            service: None,
            resource_arn: None,
        };

        assert!(matches!(synthesizer.generate(&request), Err(SynthError::EmptyDescription)));
    }

    #[test]
    fn payload_carries_model_and_schema() {
        let synthesizer = OpenAiSynthesizer::new(Some("key".to_string()), "gpt-4o-mini");
        let request = PolicyRequest {
            description: "read logs".to_string(),
            service: None,
            resource_arn: None,
        };

        let payload = synthesizer.payload(&request);
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(payload["response_format"]["json_schema"]["name"], "IAMPolicy");
        assert_eq!(payload["messages"][1]["role"], "user");
    }
}
