//! LLM 服务 - 业务能力层
//!
//! 通过 OpenAI 兼容接口实现 `ResearchService`
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{ComparableProperty, Contractor, PropertyRecord};
use crate::utils::logging::truncate_text;
use crate::services::research::{
    parse_comparables_reply, parse_contractors_reply, parse_renovation_reply, RenovationAnalysis,
    ResearchService,
};

/// 随分析请求发送的图片数量上限
const MAX_VISION_IMAGES: usize = 4;

const SYSTEM_MESSAGE: &str = "You are a residential real estate investment analyst. \
    Only use the facts you are given. If a fact is missing, treat it as unknown; never invent it. \
    Reply with JSON only.";

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 完成翻新分析、可比房源、承包商查询
/// - 只处理单个房源，不关心报告状态
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `imgs`: 图片 URL 列表（可选），会追加到用户消息中
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        imgs: Option<&[String]>,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let llm_err = |e: async_openai::error::OpenAIError| AppError::llm_failed(&self.model_name, e);

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(llm_err)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = match imgs {
            Some(img_urls) if !img_urls.is_empty() => {
                let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                    vec![ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText {
                            text: user_message.to_string(),
                        },
                    )];

                for url in img_urls {
                    content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: url.clone(),
                                detail: Some(ImageDetail::Low),
                            },
                        },
                    ));
                }

                debug!("使用 Vision API，包含 {} 张图片", img_urls.len());

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                    .build()
                    .map_err(llm_err)?
            }
            _ => ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(llm_err)?,
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(2048u32)
            .build()
            .map_err(llm_err)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            llm_err(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::llm_failed(&self.model_name, "empty reply"))?;

        debug!("LLM 回复: {}", truncate_text(content.trim(), 200));
        Ok(content.trim().to_string())
    }
}

/// 房源事实（只包含已提取到的字段，缺失的保持 null）
fn property_facts(property: &PropertyRecord) -> String {
    let facts = json!({
        "address": property.address,
        "price": property.price,
        "beds": property.beds,
        "baths": property.baths,
        "sqft": property.sqft,
        "yearBuilt": property.year_built,
        "lotSizeSqft": property.lot_size_sqft,
        "homeType": property.home_type,
        "description": property.description,
        "parking": property.parking,
        "hoaFee": property.hoa_fee,
    });
    serde_json::to_string_pretty(&facts).unwrap_or_default()
}

fn renovation_prompt(property: &PropertyRecord) -> String {
    format!(
        r#"Given the following property facts, propose renovation projects that would increase its value.

Property: {}

- Include structural and cosmetic options (e.g. adding a bedroom, building an ADU, replacing flooring).
- Estimate cost and value added for the property's location and size.
- Rate local market demand for each project and describe the likely buyer.
- If the photos reveal further work, list it under additional_suggestions.
- Summarise the local market in one short paragraph.

Return JSON with this format:
{{
  "renovation_ideas": [
    {{
      "name": "Renovation name",
      "description": "Detailed description",
      "estimated_cost": {{"low": 1000, "high": 3000}},
      "estimated_value_add": {{"low": 2000, "medium": 3000, "high": 4000}},
      "timeline": "1-2 weeks",
      "market_demand": "High/Medium/Low",
      "buyer_profile": "Example buyer profile"
    }}
  ],
  "additional_suggestions": [
    {{"name": "Suggestion from photos", "description": "Detailed description", "reason": "What in the photos prompted it"}}
  ],
  "market_summary": "Overall local market analysis"
}}"#,
        property_facts(property)
    )
}

fn comparables_prompt(property: &PropertyRecord) -> String {
    format!(
        r#"You are a comps specialist. Subject property:
{}

Select 3-5 nearby comparable properties (within 20% of the living area, similar beds/baths, within 1-3 miles, recent sales preferred).
Return JSON with this format:
{{"comparable_properties": [{{"address": "...", "sale_price": 0, "price_per_sqft": 0, "brief_summary": "...", "url": "..."}}]}}"#,
        property_facts(property)
    )
}

fn contractors_prompt(project_name: &str, address: &str) -> String {
    format!(
        r#"You are a contractor matchmaker. For the project type "{}" near the property at "{}", list 2-3 reputable local contractors.
Return JSON with this format:
{{"recommended_contractors": [{{"name": "...", "specialty": "...", "contact_info": "...", "url": "..."}}]}}"#,
        project_name, address
    )
}

#[async_trait]
impl ResearchService for LlmService {
    async fn analyze_renovations(&self, property: &PropertyRecord) -> AppResult<RenovationAnalysis> {
        let imgs: Vec<String> = property.images.iter().take(MAX_VISION_IMAGES).cloned().collect();
        let reply = self
            .send_to_llm(&renovation_prompt(property), Some(SYSTEM_MESSAGE), Some(&imgs))
            .await?;
        parse_renovation_reply(&reply)
    }

    async fn find_comparables(&self, property: &PropertyRecord) -> AppResult<Vec<ComparableProperty>> {
        let reply = self
            .send_to_llm(&comparables_prompt(property), Some(SYSTEM_MESSAGE), None)
            .await?;
        parse_comparables_reply(&reply)
    }

    async fn find_contractors(&self, project_name: &str, address: &str) -> AppResult<Vec<Contractor>> {
        let reply = self
            .send_to_llm(&contractors_prompt(project_name, address), Some(SYSTEM_MESSAGE), None)
            .await?;
        parse_contractors_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record() -> PropertyRecord {
        PropertyRecord {
            address: "123 Main St, Seattle, WA 98101".to_string(),
            price: 450000,
            beds: Some(3.0),
            baths: None,
            sqft: Some(1800),
            year_built: None,
            lot_size_sqft: None,
            home_type: None,
            description: None,
            images: vec![],
            price_per_sqft: None,
            parking: None,
            hoa_fee: None,
            source: Some("zillow".to_string()),
            source_url: "https://www.zillow.com/x".to_string(),
            provenance: BTreeMap::new(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_facts_are_sent_as_null() {
        let facts: serde_json::Value = serde_json::from_str(&property_facts(&record())).unwrap();
        assert_eq!(facts["price"], 450000);
        assert!(facts["baths"].is_null());
        assert!(facts["yearBuilt"].is_null());
    }

    #[test]
    fn test_prompts_carry_inputs() {
        assert!(renovation_prompt(&record()).contains("123 Main St"));
        let p = contractors_prompt("Kitchen refresh", "123 Main St");
        assert!(p.contains("Kitchen refresh"));
        assert!(p.contains("123 Main St"));
    }

    /// 真实 LLM 调用
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_analyze_renovations_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_analyze_renovations_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = LlmService::new(&Config::from_env());
        let analysis = service.analyze_renovations(&record()).await.unwrap();
        println!("{:#?}", analysis);
        assert!(analysis.projects.iter().all(|p| p.cost() > 0.0));
    }
}
