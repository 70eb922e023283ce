//! Prompt Templates for the Assistant Gateway
//!
//! Each call is self-contained: instructions, context and question are
//! composed into one prompt with no memory of earlier calls.

const ASSISTANT_INSTRUCTION: &str = "你是一个专业的软件研发团队助手。
请根据上下文回答用户问题。如果涉及技术问题，请给出专业建议。
请始终使用**中文**回答，并使用 Markdown 格式优化排版。";

/// Build the prompt for a free-form question about some context (usually
/// the document being read)
pub fn build_ask_prompt(question: &str, context: &str) -> String {
    format!(
        r#"Context:
{}

User Question:
{}

System Instruction:
{}"#,
        context.trim(),
        question.trim(),
        ASSISTANT_INSTRUCTION
    )
}

/// Build the prompt asking for a one-line summary and suggested test cases
pub fn build_summary_prompt(description: &str) -> String {
    format!(
        "请将以下软件需求总结为一句话，并给出 3 个建议的测试用例（请用中文回答）：\n\n{}",
        description
    )
}
