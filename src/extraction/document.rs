use scraper::{ElementRef, Html, Selector};

use crate::render::RenderedDocument;

use super::collapse_whitespace;

/// 已解析的页面
///
/// `scraper::Html` 不是 `Send`，只在同步的提取过程中存在，不能跨越 `.await`。
pub struct ParsedDocument<'a> {
    pub source: &'a RenderedDocument,
    pub html: Html,
}

impl<'a> ParsedDocument<'a> {
    pub fn parse(source: &'a RenderedDocument) -> Self {
        Self {
            source,
            html: Html::parse_document(&source.html),
        }
    }

    /// 选择器无效时返回空列表
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(css).ok()?;
        self.html.select(&selector).next()
    }

    /// 页面标题：渲染器读取的标题优先，其次 `<title>`
    pub fn title(&self) -> Option<String> {
        self.source
            .title
            .clone()
            .map(|t| collapse_whitespace(&t))
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.select_first("title")
                    .map(|el| element_text(&el))
                    .filter(|t| !t.is_empty())
            })
    }

    /// `<meta>` 的 content，按给定选择器顺序取第一个非空值
    pub fn meta_content(&self, selectors: &[&str]) -> Option<String> {
        selectors.iter().find_map(|css| {
            self.select_all(css)
                .into_iter()
                .filter_map(|el| el.value().attr("content"))
                .map(collapse_whitespace)
                .find(|c| !c.is_empty())
        })
    }

    /// 所有 `<script>` 文本
    pub fn scripts(&self) -> Vec<(Option<&str>, String)> {
        self.select_all("script")
            .into_iter()
            .map(|el| (el.value().attr("type"), el.text().collect::<String>()))
            .collect()
    }
}

/// 元素文本（压缩空白）
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}
