//! Scripted [`PolicySynthesizer`] for unit tests.

use std::cell::RefCell;

use super::document::{Effect, OneOrMany, POLICY_VERSION, PolicyDocument, Statement};
use super::{GeneratedPolicy, PolicyRequest, PolicySynthesizer, SynthError};

pub struct ScriptedSynthesizer {
    id: Option<String>,
    fail: bool,
    requests: RefCell<Vec<PolicyRequest>>,
}

impl ScriptedSynthesizer {
    /// Answers every request with an Allow-all-on-resource statement named `id`.
    pub fn returning(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            fail: false,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            id: None,
            fail: true,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PolicyRequest> {
        self.requests.borrow().clone()
    }
}

impl PolicySynthesizer for ScriptedSynthesizer {
    fn generate(&self, request: &PolicyRequest) -> Result<GeneratedPolicy, SynthError> {
        self.requests.borrow_mut().push(request.clone());
        if self.fail {
            return Err(SynthError::EmptyResponse);
        }

        let resource = request.resource_arn.clone().unwrap_or_else(|| "*".to_string());
        let document = PolicyDocument {
            version: POLICY_VERSION.to_string(),
            id: self.id.clone(),
            statement: vec![Statement {
                sid: None,
                effect: Effect::Allow,
                principal: None,
                not_principal: None,
                action: Some(OneOrMany::One("s3:GetObject".to_string())),
                not_action: None,
                resource: Some(OneOrMany::One(resource)),
                not_resource: None,
                condition: None,
            }],
        };
        GeneratedPolicy::from_document(&request.description, document)
    }
}
