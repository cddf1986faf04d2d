//! Context assembly: one ordered, size-bounded document from a research bundle.
//!
//! Sections always appear in the same order, from most to least trusted:
//! relationship history, cohort data, the company's own site, search results,
//! external sources, directories, then a summary. Each section is truncated
//! as it is formatted; assembly never fails.

use dossier_shared::{
    CohortConfig, CohortContext, ContextBudgets, PageMap, RelationshipContext, ResearchBundle,
    truncate_chars,
};

/// Externally supplied context merged into the document.
#[derive(Debug, Clone, Default)]
pub struct ContextInputs {
    pub relationship: Option<RelationshipContext>,
    pub cohort: Option<CohortContext>,
}

/// Format `bundle` (plus optional inputs) into the research context document.
pub fn assemble_context(
    bundle: &ResearchBundle,
    inputs: &ContextInputs,
    budgets: &ContextBudgets,
    cohort_config: &CohortConfig,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    push_header(&mut parts, bundle, cohort_config);

    if let Some(relationship) = inputs.relationship.as_ref().filter(|r| !r.is_empty()) {
        push_relationship(&mut parts, relationship, budgets);
    }
    if let Some(cohort) = inputs.cohort.as_ref().filter(|c| !c.is_empty()) {
        push_cohort(&mut parts, cohort, budgets);
    }

    push_domain_pages(&mut parts, &bundle.domain_pages, budgets);
    push_search_results(&mut parts, bundle, budgets);
    push_external_sources(&mut parts, &bundle.external_content, budgets);

    if let Some(record) = bundle.directory_record.as_ref().filter(|r| !r.content.is_empty()) {
        parts.push("\n=== COMPANY DIRECTORY ===".into());
        parts.push(truncate_chars(&record.content, budgets.directory_chars).to_string());
    }
    if let Some(record) = bundle
        .cohort_directory_record
        .as_ref()
        .filter(|r| !r.content.is_empty())
    {
        parts.push("\n=== COHORT DIRECTORY ===".into());
        parts.push(truncate_chars(&record.content, budgets.directory_chars).to_string());
    }

    parts.push("\n=== RESEARCH SUMMARY ===".into());
    parts.push(format!("Total pages crawled: {}", bundle.total_pages()));
    parts.push(format!("Search results found: {}", bundle.search_results.len()));
    if !bundle.errors.is_empty() {
        parts.push(format!("\nResearch errors: {}", bundle.errors.join("; ")));
    }

    parts.join("\n")
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn push_header(parts: &mut Vec<String>, bundle: &ResearchBundle, cohort_config: &CohortConfig) {
    let request = &bundle.request;
    let mut header = format!(
        "=== COMPREHENSIVE RESEARCH DATA FOR {} ({}) ===",
        request.company,
        request.domain().unwrap_or("no website")
    );
    if let Some(source) = request.provenance() {
        header.push_str(&format!("\nSource: {source}"));
        if cohort_config.is_cohort_code(source) {
            header.push_str(" (cohort batch)");
        }
    }
    header.push('\n');
    parts.push(header);
}

fn push_relationship(
    parts: &mut Vec<String>,
    relationship: &RelationshipContext,
    budgets: &ContextBudgets,
) {
    parts.push("\n=== RELATIONSHIP & EMAIL HISTORY ===".into());

    if let Some(intro) = &relationship.introducer {
        parts.push(format!("\n**Introducer:** {}", or_unknown(&intro.name)));
        if let Some(email) = &intro.email {
            parts.push(format!("  Email: {email}"));
        }
        if let Some(context) = &intro.context {
            parts.push(format!("  Context: {context}"));
        }
    }

    if !relationship.contacts.is_empty() {
        parts.push("\n**Key Contacts:**".into());
        for contact in &relationship.contacts {
            let mut line = format!("- {}", or_unknown(&contact.name));
            if let Some(email) = &contact.email {
                line.push_str(&format!(" ({email})"));
            }
            if let Some(role) = &contact.role {
                line.push_str(&format!(" - {role}"));
            }
            parts.push(line);
        }
    }

    if let Some(summary) = &relationship.summary {
        parts.push(format!("\n**Relationship Summary:**\n{summary}"));
    }

    if !relationship.timeline.is_empty() {
        parts.push("\n**Communication Timeline:**".into());
        for event in relationship.timeline.iter().take(budgets.max_timeline_events) {
            let date = event.date.as_deref().unwrap_or("Unknown date");
            parts.push(format!("- [{date}] {}", event.event));
        }
    }

    if !relationship.key_topics.is_empty() {
        parts.push(format!(
            "\n**Key Topics Discussed:** {}",
            relationship.key_topics.join(", ")
        ));
    }

    if let Some(next_steps) = &relationship.next_steps {
        parts.push(format!("\n**Next Steps:** {next_steps}"));
    }

    if !relationship.raw_messages.is_empty() {
        parts.push("\n**Email Thread Content:**".into());
        for (i, msg) in relationship.raw_messages.iter().take(budgets.max_messages).enumerate() {
            parts.push(format!("\n--- Email {} ---", i + 1));
            if let Some(from) = &msg.from {
                parts.push(format!("From: {from}"));
            }
            if let Some(date) = &msg.date {
                parts.push(format!("Date: {date}"));
            }
            if let Some(subject) = &msg.subject {
                parts.push(format!("Subject: {subject}"));
            }
            if let Some(body) = &msg.body {
                parts.push(truncate_chars(body, budgets.body_chars).to_string());
            }
        }
    }
}

fn push_cohort(parts: &mut Vec<String>, cohort: &CohortContext, budgets: &ContextBudgets) {
    if !cohort.founders.is_empty() {
        parts.push("\n=== COHORT FOUNDERS ===".into());
        for founder in &cohort.founders {
            let mut line = format!("- {}", or_unknown(&founder.name));
            if let Some(email) = &founder.email {
                line.push_str(&format!(" ({email})"));
            }
            parts.push(line);
        }
    }

    if !cohort.posts.is_empty() {
        parts.push("\n=== COHORT POSTS (founder-written content) ===".into());
        for (i, post) in cohort.posts.iter().take(budgets.max_posts).enumerate() {
            if let Some(title) = &post.title {
                parts.push(format!("\n**Post {}: {title}**", i + 1));
            }
            if let Some(author) = &post.author {
                parts.push(format!("Author: {author}"));
            }
            if let Some(body) = &post.body {
                parts.push(truncate_chars(body, budgets.body_chars).to_string());
            }
        }
    }
}

fn push_domain_pages(parts: &mut Vec<String>, pages: &PageMap, budgets: &ContextBudgets) {
    if pages.is_empty() {
        return;
    }
    parts.push(format!(
        "\n=== COMPANY WEBSITE CONTENT ({} pages crawled) ===",
        pages.len()
    ));
    for page in pages.iter().take(budgets.max_domain_pages) {
        parts.push(format!("\n--- Page: {} ---", page.url));
        if !page.title.is_empty() {
            parts.push(format!("Title: {}", page.title));
        }
        if let Some(description) = &page.meta_description {
            parts.push(format!("Description: {description}"));
        }
        if !page.content.is_empty() {
            parts.push(truncate_chars(&page.content, budgets.domain_page_chars).to_string());
        }
    }
}

fn push_search_results(parts: &mut Vec<String>, bundle: &ResearchBundle, budgets: &ContextBudgets) {
    let results = &bundle.search_results;
    if results.is_empty() {
        return;
    }
    parts.push(format!("\n=== SEARCH RESULTS ({} found) ===", results.len()));
    for r in results.iter().take(budgets.max_search_results) {
        let title = if r.title.is_empty() { "No title" } else { &r.title };
        let snippet = truncate_chars(&r.snippet, budgets.snippet_chars);
        parts.push(format!("- [{title}]({}): {snippet}", r.url));
    }
}

fn push_external_sources(parts: &mut Vec<String>, pages: &PageMap, budgets: &ContextBudgets) {
    if pages.is_empty() {
        return;
    }
    parts.push(format!(
        "\n=== EXTERNAL SOURCES ({} pages scraped) ===",
        pages.len()
    ));
    for page in pages.iter().take(budgets.max_external_sources) {
        parts.push(format!("\n--- Source: {} ---", page.url));
        if !page.title.is_empty() {
            parts.push(format!("Title: {}", page.title));
        }
        if !page.content.is_empty() {
            parts.push(truncate_chars(&page.content, budgets.external_source_chars).to_string());
        }
    }
}

fn or_unknown(name: &str) -> &str {
    if name.trim().is_empty() { "Unknown" } else { name }
}
