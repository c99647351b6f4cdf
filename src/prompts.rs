//! Prompt template for per-page analysis.
//!
//! The prompt and the response parser in [`crate::pipeline::parse`] share one
//! contract: the five section headings in [`SECTION_HEADINGS`]. The prompt
//! asks for them as `###` headings; the parser looks for them at any heading
//! level. Keep both sides reading from the constants here.

use once_cell::sync::Lazy;
use regex::Regex;

/// Topic used when the caller does not pass one.
pub const DEFAULT_TOPIC: &str = "技术综述";

/// Concept explanation.
pub const HEADING_CONCEPTS: &str = "概念解释";
/// Technical challenges.
pub const HEADING_CHALLENGES: &str = "技术挑战";
/// Solution detail.
pub const HEADING_SOLUTION: &str = "解决方案";
/// Advantages.
pub const HEADING_ADVANTAGES: &str = "方案优势";
/// Best practices.
pub const HEADING_PRACTICES: &str = "最佳实践";

/// The five headings, in report order.
pub const SECTION_HEADINGS: [&str; 5] = [
    HEADING_CONCEPTS,
    HEADING_CHALLENGES,
    HEADING_SOLUTION,
    HEADING_ADVANTAGES,
    HEADING_PRACTICES,
];

const PROMPT_TEMPLATE: &str = r#"作为一位专业的技术分析专家，请帮助我深入理解以下内容。

主题方向：{topic}

源内容：
{text}

请按照以下结构进行内容分析和总结， 需避免单纯的列表罗列：

### 概念解释
请提取并解释文中最关键的2-3个技术概念或术语，确保解释准确且易于理解。

### 技术挑战
分析文中描述的主要技术挑战，以及传统解决方案的局限性

### 解决方案
详细分析文中提出的解决方案：
- 核心技术架构
- 关键实现方法

### 方案优势
系统总结该方案的优势

### 最佳实践
总结相关领域的实践经验

要求：
- 分析要准确、客观，避免主观臆测
- 重点突出技术本质和创新点
- 保持专业性的同时确保表述清晰
- 适当补充相关领域的专业见解
- 每个部分都需要完整的语段阐述，而不是简单列举
- 必须使用上述五个 ### 标题，标题文字保持不变

请基于文本内容进行分析，如有不足之处，可以基于专业知识适当补充，但要明确区分原文信息和补充信息。
"#;

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(topic|text)\}").unwrap());

/// Build the analysis prompt for one page.
///
/// Both placeholders are filled in a single pass, so braces inside the
/// topic or the page text are never expanded.
pub fn build_prompt(page_text: &str, topic: &str) -> String {
    RE_PLACEHOLDER
        .replace_all(PROMPT_TEMPLATE, |caps: &regex::Captures<'_>| match &caps[1] {
            "topic" => topic,
            _ => page_text,
        })
        .into_owned()
}
