//! Six canonical prompt templates (spec §4.8 "Prompt templates"). Each
//! places reasoning inside `<thinking>…</thinking>` markers so
//! [`crate::markers::extract_thinking`] can separate it from the answer.

#[must_use]
pub fn chain_of_thought(task: &str, context: Option<&str>) -> String {
    let context_line = context.map(|c| format!("Context: {c}\n")).unwrap_or_default();
    format!(
        "Think through this step-by-step before answering.\n\n\
         Task: {task}\n{context_line}\n\
         Please reason through this carefully:\n\
         1. Break down the problem\n\
         2. Consider each step\n\
         3. Think about edge cases\n\
         4. Arrive at a solution\n\n\
         Use <thinking>your reasoning here</thinking> tags to show your thought process.\n\
         Then provide your final answer."
    )
}

#[must_use]
pub fn extended_thinking(task: &str, context: Option<&str>) -> String {
    let context_line = context.map(|c| format!("Context: {c}\n")).unwrap_or_default();
    format!(
        "This is a complex task that requires deep, careful reasoning.\n\n\
         Task: {task}\n{context_line}\n\
         Take your time to think through this thoroughly:\n\n\
         <thinking>\n\
         Consider multiple approaches:\n\
         1. What are the key constraints and requirements?\n\
         2. What are different ways to solve this?\n\
         3. What are the trade-offs of each approach?\n\
         4. What edge cases or failure modes exist?\n\
         5. What is the most robust solution?\n\n\
         Reason through each step carefully, questioning your assumptions.\n\
         </thinking>\n\n\
         After your thorough analysis, provide your final answer."
    )
}

#[must_use]
pub fn self_critique(previous_response: &str, original_task: &str) -> String {
    format!(
        "Review and critique the following response to improve it.\n\n\
         Original Task: {original_task}\n\n\
         Previous Response:\n{previous_response}\n\n\
         <thinking>\n\
         Critically evaluate this response:\n\
         1. Are there any errors or inaccuracies?\n\
         2. Are there missing important details?\n\
         3. Could the explanation be clearer?\n\
         4. Are there better approaches?\n\
         5. What improvements can be made?\n\
         </thinking>\n\n\
         Provide an improved version that addresses any issues found."
    )
}

#[must_use]
pub fn tree_of_thought(task: &str, num_paths: u32) -> String {
    format!(
        "Explore multiple different approaches to solve this task.\n\n\
         Task: {task}\n\n\
         <thinking>\n\
         Generate {num_paths} different approaches, each with its reasoning,\n\
         pros, and cons, then evaluate them and select the best.\n\
         </thinking>\n\n\
         Implement the best approach."
    )
}

#[must_use]
pub fn deep_thinking(task: &str, context: Option<&str>) -> String {
    let context_line = context.map(|c| format!("Context: {c}\n")).unwrap_or_default();
    format!(
        "This is a highly complex task that requires your deepest, most thorough reasoning.\n\
         Take your time and think through this comprehensively.\n\n\
         Task: {task}\n{context_line}\n\
         <thinking>\n\
         You have a large thinking budget. Use it wisely to explore this problem deeply.\n\n\
         Phase 1: Problem Understanding\n\
         Phase 2: Solution Exploration\n\
         Phase 3: Deep Analysis\n\
         Phase 4: Implementation Planning\n\
         Phase 5: Self-Critique\n\
         </thinking>\n\n\
         After this thorough analysis, provide your best solution."
    )
}

#[must_use]
pub fn task_complexity_analysis(task: &str) -> String {
    format!(
        "Analyze the complexity of this task to determine the appropriate reasoning approach.\n\n\
         Task: {task}\n\n\
         Rate this task on these dimensions (1-10):\n\
         - Complexity: How many steps or components?\n\
         - Ambiguity: How clear are the requirements?\n\
         - Novelty: How unique or creative does the solution need to be?\n\
         - Risk: How critical is correctness?\n\n\
         Respond with JSON only:\n\
         {{\"complexity\": <1-10>, \"ambiguity\": <1-10>, \"novelty\": <1-10>, \"risk\": <1-10>}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_of_thought_embeds_task_and_thinking_tag() {
        let prompt = chain_of_thought("sort a list", None);
        assert!(prompt.contains("sort a list"));
        assert!(prompt.contains("<thinking>"));
    }

    #[test]
    fn complexity_analysis_requests_json_fields() {
        let prompt = task_complexity_analysis("design a cache");
        assert!(prompt.contains("\"complexity\""));
        assert!(prompt.contains("\"risk\""));
    }
}
