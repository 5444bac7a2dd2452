//! Prompt router — keyword intent detection and system prompt assembly.
//!
//! Intent detection is pure: lowercase substring match against per-domain
//! keyword lists, no randomness, no time dependence, no LLM calls. The
//! same query always yields the same assembly, byte for byte.

use attache_core::tool::{Domain, ToolDescriptor};

use crate::prompts;

/// A prompt fragment gated by domain keywords.
struct DomainBlock {
    domain: Domain,
    /// Empty for the fallback block; it never matches by keyword.
    keywords: &'static [&'static str],
    title: &'static str,
    body: &'static str,
}

/// A prompt fragment gated by capability keywords. Additive; independent
/// of domain detection.
struct CapabilityBlock {
    keywords: &'static [&'static str],
    title: &'static str,
    body: &'static str,
}

/// Inputs for one prompt assembly.
pub struct AssemblyInput<'a> {
    pub query: &'a str,
    pub tools: &'a [ToolDescriptor],
    pub user_context: Option<&'a str>,
}

/// Keyword-driven intent classifier and prompt assembler.
///
/// Read-only after construction; safe for concurrent use.
pub struct PromptRouter {
    domains: Vec<DomainBlock>,
    capabilities: Vec<CapabilityBlock>,
}

impl PromptRouter {
    pub fn new() -> Self {
        Self {
            domains: vec![
                DomainBlock {
                    domain: Domain::Email,
                    keywords: prompts::EMAIL_KEYWORDS,
                    title: "Email",
                    body: prompts::EMAIL_BLOCK,
                },
                DomainBlock {
                    domain: Domain::Calendar,
                    keywords: prompts::CALENDAR_KEYWORDS,
                    title: "Calendar",
                    body: prompts::CALENDAR_BLOCK,
                },
                DomainBlock {
                    domain: Domain::General,
                    keywords: &[],
                    title: "General",
                    body: prompts::GENERAL_BLOCK,
                },
            ],
            capabilities: vec![CapabilityBlock {
                keywords: prompts::WIDGET_KEYWORDS,
                title: "Custom UI",
                body: prompts::WIDGET_GUIDE,
            }],
        }
    }

    /// Detect the domains a query touches. Falls back to `general` when no
    /// keyword matches.
    pub fn detect_domains(&self, query: &str) -> Vec<Domain> {
        let lowered = query.to_lowercase();
        let detected: Vec<Domain> = self
            .domains
            .iter()
            .filter(|block| {
                !block.keywords.is_empty()
                    && block.keywords.iter().any(|kw| lowered.contains(kw))
            })
            .map(|block| block.domain)
            .collect();

        if detected.is_empty() {
            vec![Domain::General]
        } else {
            detected
        }
    }

    /// The tool subset offered for a detected domain set: every tool whose
    /// domain matches, plus every tool without a domain tag.
    pub fn relevant_tools<'a>(
        &self,
        all: &'a [ToolDescriptor],
        domains: &[Domain],
    ) -> Vec<&'a ToolDescriptor> {
        all.iter()
            .filter(|tool| match tool.domain {
                Some(domain) => domains.contains(&domain),
                None => true,
            })
            .collect()
    }

    /// Assemble the full system prompt.
    pub fn assemble(&self, input: &AssemblyInput<'_>) -> String {
        let lowered = input.query.to_lowercase();
        let domains = self.detect_domains(input.query);

        let mut sections: Vec<String> = Vec::new();
        sections.push(format!("## Persona\n{}", prompts::PERSONA));
        sections.push(format!("## Guardrails\n{}", prompts::GUARDRAILS));

        for block in &self.domains {
            if domains.contains(&block.domain) {
                sections.push(format!("## {}\n{}", block.title, block.body));
            }
        }

        for cap in &self.capabilities {
            if cap.keywords.iter().any(|kw| lowered.contains(kw)) {
                sections.push(format!("## {}\n{}", cap.title, cap.body));
            }
        }

        sections.push(format!("## Tools\n{}", render_tools(input.tools)));
        sections.push(format!("## Response Format\n{}", prompts::RESPONSE_FORMAT));

        if let Some(context) = input.user_context {
            sections.push(format!("## User Context\n{context}"));
        }

        sections.join("\n\n")
    }
}

impl Default for PromptRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the tools block from the filtered descriptor set.
fn render_tools(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "No tools available.".into();
    }

    let mut out = String::new();
    for (i, tool) in tools.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!("### {}\n{}", tool.name, tool.description));

        if !tool.parameters.params.is_empty() {
            out.push_str("\nParameters:");
            for param in &tool.parameters.params {
                let requirement = if tool.parameters.is_required(&param.name) {
                    "required"
                } else {
                    "optional"
                };
                out.push_str(&format!(
                    "\n- {} ({}, {}): {}",
                    param.name, param.param_type, requirement, param.description
                ));
                if let Some(values) = &param.enum_values {
                    out.push_str(&format!(" One of: {}.", values.join(", ")));
                }
            }
        }

        let hints = &tool.hints;
        if let Some(when) = &hints.when_to_use {
            out.push_str(&format!("\nUse when: {when}"));
        }
        if let Some(when_not) = &hints.when_not_to_use {
            out.push_str(&format!("\nAvoid when: {when_not}"));
        }
        if let Some(prereq) = &hints.prerequisites {
            out.push_str(&format!("\nRequires: {prereq}"));
        }
    }
    out
}
