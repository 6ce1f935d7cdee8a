//! Prompt 构建服务
//!
//! 把用户的网站想法代入固定模板，得到发给模型的完整指令。

/// 想法占位符
const IDEA_PLACEHOLDER: &str = "{idea}";

/// 改写指令模板
const IMPROVE_TEMPLATE: &str = r#"You are a product expert helping users turn rough website ideas
into clear, detailed prompts they can use to build a website.

User idea:
"{idea}"

Rewrite it as a clear, structured website prompt.
Focus on:
- Website purpose
- Key sections
- Target users
- Design tone

Improved prompt:"#;

/// Prompt 模板
///
/// 进程级常量，启动时构建一次，按请求只读使用。
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: &'static str,
}

impl PromptTemplate {
    /// 网站想法改写模板
    pub fn improve_idea() -> Self {
        Self {
            template: IMPROVE_TEMPLATE,
        }
    }

    /// 代入想法
    ///
    /// 单次替换：想法中的花括号或指令文本原样保留，不会被再次解释。
    pub fn render(&self, idea: &str) -> String {
        self.template.replace(IDEA_PLACEHOLDER, idea)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::improve_idea()
    }
}
