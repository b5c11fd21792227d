//! JS 执行器 - 基础设施层
//!
//! 持有一个 page 资源，只暴露"执行 JS / 读取页面"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::AppResult;

/// 读取页面全局对象上的内嵌状态，序列化为字符串数组
const STATE_SCAN_JS: &str = r#"
(() => {
  const keys = ['__NEXT_DATA__', '__INITIAL_STATE__', '__PRELOADED_STATE__', '__APOLLO_STATE__', '__REDUX_STATE__'];
  const out = [];
  for (const k of keys) {
    try {
      if (window[k]) out.push(JSON.stringify(window[k]));
    } catch (e) {}
  }
  return out;
})()
"#;

/// JS 执行器
///
/// 职责：
/// - 持有单个 Page 资源
/// - 暴露 eval() 能力和只读的页面信息
/// - 不认识房源 / 报告
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 打开地址
    pub async fn goto(&self, url: &str) -> AppResult<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    /// 等待导航完成
    pub async fn wait_for_navigation(&self) -> AppResult<()> {
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    /// 导航结束后的最终 URL
    pub async fn current_url(&self) -> AppResult<Option<String>> {
        Ok(self.page.url().await?)
    }

    pub async fn content(&self) -> AppResult<String> {
        Ok(self.page.content().await?)
    }

    pub async fn title(&self) -> AppResult<Option<String>> {
        Ok(self.page.get_title().await?)
    }

    /// 页面全局对象上的内嵌状态
    pub async fn state_payloads(&self) -> AppResult<Vec<String>> {
        self.eval_as(STATE_SCAN_JS).await
    }

    /// 关闭页面
    pub async fn close(self) -> AppResult<()> {
        self.page.close().await?;
        Ok(())
    }
}
