//! Request, response and record types for batchllm

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ===== Input =====

/// One unit of input text and its fixed position in the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt
{   pub index: usize
  , pub text: String
}

impl Prompt
{   pub fn new(index: usize, text: impl Into<String>) -> Self
    {   Prompt
        {   index
          , text: text.into()
        }
    }

    /// Number a plain sequence of texts in input order
    pub fn sequence<I, S>(texts: I) -> Vec<Prompt>
    where
      I: IntoIterator<Item = S>
    , S: Into<String>
    {   texts.into_iter()
          .enumerate()
          .map(|(index, text)| Prompt::new(index, text))
          .collect()
    }
}

// ===== Gateway request =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

impl ChatMessage
{   pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: "system".to_string()
          , content: content.into()
        }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: "user".to_string()
          , content: content.into()
        }
    }
}

/// Body posted to a gateway route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest
{   pub messages: Vec<ChatMessage>
  , pub temperature: f32
}

impl ChatRequest
{   /// Text of the user turn
    pub fn user_text(&self) -> Option<&str>
    {   self.messages.iter()
          .find(|m| m.role == "user")
          .map(|m| m.content.as_str())
    }
}

/// One attempt's worth of request: the route plus its body
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest
{   pub route: String
  , pub body: ChatRequest
}

impl QueryRequest
{   /// System instructions first, then the prompt as the user turn
    pub fn new(
      route: &str
    , instructions: &str
    , prompt: &str
    , temperature: f32
    ) -> Self
    {   QueryRequest
        {   route: route.to_string()
          , body: ChatRequest
            {   messages: vec![
                  ChatMessage::system(instructions)
                , ChatMessage::user(prompt)
                ]
              , temperature
            }
        }
    }
}

// ===== Gateway response =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse
{   pub metadata: ResponseMetadata
  , pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata
{   pub model: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_type: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate
{   pub message: CandidateMessage
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CandidateMetadata>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMessage
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , pub content: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata
{   #[serde(default)]
    pub finish_reason: Option<String>
}

impl QueryResponse
{   /// Single-candidate response, mostly for scripted clients
    pub fn new(
      model: impl Into<String>
    , content: impl Into<String>
    ) -> Self
    {   QueryResponse
        {   metadata: ResponseMetadata
            {   model: model.into()
              , route_type: None
              , input_tokens: None
              , output_tokens: None
              , total_tokens: None
            }
          , candidates: vec![
              Candidate
              {   message: CandidateMessage
                  {   role: Some("assistant".to_string())
                    , content: content.into()
                  }
                , metadata: None
              }
            ]
        }
    }

    /// Content of the first candidate
    pub fn first_content(&self) -> Option<&str>
    {   self.candidates.first()
          .map(|c| c.message.content.as_str())
    }
}

// ===== Output =====

/// One output row; exactly one exists per input prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord
{   /// Local civil time at a fixed UTC offset
    pub timestamp: NaiveDateTime
  , /// Empty when the prompt degraded
    pub model: String
  , pub temperature: f32
  , pub prompt: String
  , /// Empty when the prompt degraded
    pub response: String
}

impl ResultRecord
{   pub fn is_degraded(&self) -> bool
    {   self.model.is_empty() && self.response.is_empty()
    }
}
