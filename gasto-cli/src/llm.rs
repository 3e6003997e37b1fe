use anyhow::{Context, Result, bail};
use gasto_pipeline::{CategoryClassifier, ClassificationRequest};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            other => bail!("unknown llm provider: {other}"),
        }
    }
}

/// Category classifier backed by a chat-completion endpoint
#[derive(Clone)]
pub struct LlmClassifier {
    provider: Provider,
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl LlmClassifier {
    /// `None` when the model fallback is disabled or its key env var is unset
    pub fn from_config(cfg: &LlmSection) -> Result<Option<Self>> {
        if !cfg.enabled {
            return Ok(None);
        }
        let provider = Provider::from_name(&cfg.provider)?;
        let Ok(api_key) = std::env::var(&cfg.api_key_env) else {
            debug!(var = %cfg.api_key_env, "llm api key not set, model fallback off");
            return Ok(None);
        };
        Ok(Some(Self {
            provider,
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }))
    }

    async fn classify_async(&self, request: &ClassificationRequest<'_>) -> Result<String> {
        let system = system_prompt(request.vocabulary);
        let user = user_prompt(request);
        match self.provider {
            Provider::Anthropic => self.anthropic_complete(&system, &user, request).await,
            Provider::OpenAI => self.openai_complete(&system, &user, request).await,
        }
    }

    async fn anthropic_complete(
        &self,
        system: &str,
        user: &str,
        request: &ClassificationRequest<'_>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: i32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: &self.model,
            max_tokens: 20,
            system,
            messages: vec![Msg {
                role: "user",
                content: user,
            }],
        };

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .headers(headers)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("anthropic error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse anthropic response")?;
        let mut s = String::new();
        for b in out.content {
            if b.t == "text" {
                if let Some(t) = b.text {
                    s.push_str(&t);
                }
            }
        }
        Ok(s)
    }

    async fn openai_complete(
        &self,
        system: &str,
        user: &str,
        request: &ClassificationRequest<'_>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse openai response")?;
        Ok(out
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

impl CategoryClassifier for LlmClassifier {
    fn classify(&self, request: &ClassificationRequest<'_>) -> Result<Option<String>> {
        // A nested block_on would panic inside a runtime.
        let raw = if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(self.classify_async(request)))?
        } else {
            let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
            rt.block_on(self.classify_async(request))?
        };
        Ok(clean_answer(&raw))
    }
}

fn system_prompt(vocabulary: &[String]) -> String {
    format!(
        "Você classifica gastos pessoais. Responda apenas com o nome de uma destas categorias, \
         exatamente como escrito: {}. Se nenhuma servir, responda NENHUMA.",
        vocabulary.join(", ")
    )
}

fn user_prompt(request: &ClassificationRequest<'_>) -> String {
    format!(
        "Estabelecimento: {}\nValor: {}\nTipo: {}\nMensagem: {}",
        request.merchant,
        request.amount,
        request.direction.as_str(),
        request.details
    )
}

/// First line of the answer without quotes or trailing punctuation;
/// `None` for an empty or explicit no-match answer.
fn clean_answer(raw: &str) -> Option<String> {
    let line = raw.lines().find(|l| !l.trim().is_empty())?;
    let cleaned =
        line.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '.'));
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nenhuma") {
        return None;
    }
    Some(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasto_core::Direction;
    use rust_decimal::Decimal;
    use std::time::Duration;

    #[test]
    fn test_clean_answer() {
        assert_eq!(clean_answer("Lazer"), Some("Lazer".to_string()));
        assert_eq!(clean_answer("  \"Saúde\".\n"), Some("Saúde".to_string()));
        assert_eq!(clean_answer("**Transporte**"), Some("Transporte".to_string()));
        assert_eq!(clean_answer("\n\nCompras\nporque..."), Some("Compras".to_string()));
        assert_eq!(clean_answer("NENHUMA"), None);
        assert_eq!(clean_answer("   "), None);
    }

    #[test]
    fn test_prompts_carry_vocabulary_and_fields() {
        let vocabulary = vec!["Alimentação".to_string(), "Lazer".to_string()];
        let request = ClassificationRequest {
            merchant: "karaokê",
            amount: Decimal::new(12000, 2),
            details: "r$ 120 no karaokê",
            direction: Direction::Expense,
            vocabulary: &vocabulary,
            timeout: Duration::from_secs(5),
        };
        assert!(system_prompt(&vocabulary).contains("Alimentação, Lazer"));
        let user = user_prompt(&request);
        assert!(user.contains("Estabelecimento: karaokê"));
        assert!(user.contains("Valor: 120.00"));
        assert!(user.contains("Tipo: expense"));
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::from_name("OpenAI").unwrap(), Provider::OpenAI);
        assert_eq!(Provider::from_name(" anthropic ").unwrap(), Provider::Anthropic);
        assert!(Provider::from_name("gemini").is_err());
    }

    #[test]
    fn test_disabled_config_yields_no_classifier() {
        let cfg = LlmSection::default();
        assert!(LlmClassifier::from_config(&cfg).unwrap().is_none());
    }
}
