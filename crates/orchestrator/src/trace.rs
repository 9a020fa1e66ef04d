//! Human-readable record of the explicit pipeline's steps.

/// Ordered list of short step descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowTrace {
    steps: Vec<String>,
}

impl WorkflowTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: impl Into<String>) {
        let step = step.into();
        tracing::debug!(step = %step, "Pipeline step");
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Bullet list of the steps, one per line.
    pub fn bullets(&self) -> String {
        self.steps
            .iter()
            .map(|step| format!("• {}", step))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Suffix appended to an answer when the trace is shown.
    pub fn render(&self) -> String {
        format!("\n\n---\nWorkflow Steps:\n{}", self.bullets())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let mut trace = WorkflowTrace::new();
        trace.push("Generating structured query...");
        trace.push("Found 3 records");

        assert_eq!(
            trace.render(),
            "\n\n---\nWorkflow Steps:\n• Generating structured query...\n• Found 3 records"
        );
        assert_eq!(trace.steps().len(), 2);
    }
}
