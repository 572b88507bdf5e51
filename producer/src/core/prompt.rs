//! Prompt construction for legal Q&A samples
//!
//! A prompt names the work item, describes what the requested sample type
//! looks like, and spells out the answer structure and reasoning depth the
//! response processor will later check for.

use rand::seq::SliceRandom;
use shared::{Difficulty, SampleType, WorkItem};

/// Depth requirements per difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultySpec {
    pub min_words: u32,
    pub min_citations: u32,
    pub min_steps: usize,
    pub max_steps: usize,
    pub complexity: &'static str,
    pub description: &'static str,
}

impl DifficultySpec {
    pub fn for_level(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Basic => Self {
                min_words: 250,
                min_citations: 2,
                min_steps: 4,
                max_steps: 5,
                complexity: "foundational legal concepts, straightforward application",
                description: "Entry-level legal principles for general understanding",
            },
            Difficulty::Intermediate => Self {
                min_words: 350,
                min_citations: 2,
                min_steps: 5,
                max_steps: 6,
                complexity: "multi-factor analysis, moderate complexity",
                description: "Practical application requiring balanced legal analysis",
            },
            Difficulty::Advanced => Self {
                min_words: 450,
                min_citations: 3,
                min_steps: 6,
                max_steps: 7,
                complexity: "complex scenarios, multiple legal doctrines",
                description: "Sophisticated analysis with competing considerations",
            },
            Difficulty::Expert => Self {
                min_words: 500,
                min_citations: 3,
                min_steps: 7,
                max_steps: 8,
                complexity: "edge cases, conflicting authorities, nuanced analysis",
                description: "Expert-level reasoning with cutting-edge legal issues",
            },
        }
    }
}

/// Section headings an answer of each sample type is expected to contain
pub fn structure_headings(sample_type: SampleType) -> [&'static str; 4] {
    match sample_type {
        SampleType::CaseAnalysis => ["ISSUE", "RULE", "APPLICATION", "CONCLUSION"],
        SampleType::Educational => ["DEFINITION", "LEGAL BASIS", "KEY ELEMENTS", "EXAMPLES"],
        SampleType::ClientInteraction => ["UNDERSTANDING", "LEGAL POSITION", "OPTIONS", "RECOMMENDATION"],
        SampleType::StatutoryInterpretation => ["STATUTORY TEXT", "PURPOSE", "INTERPRETATION", "APPLICATION"],
    }
}

struct TypeGuide {
    title: &'static str,
    objective: &'static str,
    question_format: &'static str,
    context: &'static str,
    structure: &'static str,
    reasoning: &'static str,
}

fn type_guide(sample_type: SampleType) -> TypeGuide {
    match sample_type {
        SampleType::CaseAnalysis => TypeGuide {
            title: "Case Analysis",
            objective: "Analyze a practical legal problem using case law and statutes",
            question_format: "Present a realistic client scenario requiring legal analysis and advice",
            context: "A client comes to you with a factual situation requiring legal assessment",
            structure: "IRAC methodology (mandatory):\n\
                        - ISSUE: identify the core legal question\n\
                        - RULE: state the applicable UK law (statutes and case law)\n\
                        - APPLICATION: apply the rules to the facts step by step\n\
                        - CONCLUSION: give a clear answer with legal justification",
            reasoning: "Demonstrate IRAC progression through the steps",
        },
        SampleType::Educational => TypeGuide {
            title: "Educational",
            objective: "Explain legal principles, doctrines and rules to teach foundational concepts",
            question_format: "Ask a question about a legal concept, doctrine or principle",
            context: "A student or junior lawyer wants to understand a legal doctrine",
            structure: "Structured explanation (mandatory):\n\
                        - DEFINITION: define the legal concept or doctrine\n\
                        - LEGAL BASIS: explain the statutory and case law foundation\n\
                        - KEY ELEMENTS: break down the essential requirements\n\
                        - EXAMPLES: show how it works in practice\n\
                        - DISTINCTIONS: clarify common misconceptions",
            reasoning: "Show progression from definition to practical application",
        },
        SampleType::ClientInteraction => TypeGuide {
            title: "Client Interaction",
            objective: "Demonstrate effective lawyer-client communication and practical advice",
            question_format: "Present a client communication scenario requiring professional guidance",
            context: "A client asks for practical guidance on how to proceed with a matter",
            structure: "Client communication structure (mandatory):\n\
                        - UNDERSTANDING: acknowledge and clarify the client's situation\n\
                        - LEGAL POSITION: explain the relevant law in client-friendly terms\n\
                        - OPTIONS: present the available courses of action with pros and cons\n\
                        - RECOMMENDATION: advise on the best approach\n\
                        - NEXT STEPS: list clear, actionable next steps",
            reasoning: "Show client-focused reasoning from understanding to action",
        },
        SampleType::StatutoryInterpretation => TypeGuide {
            title: "Statutory Interpretation",
            objective: "Explain and apply specific statutory provisions",
            question_format: "Ask about the meaning, application or implications of a statute",
            context: "Someone needs to understand what a statutory provision means and how it applies",
            structure: "Statutory analysis structure (mandatory):\n\
                        - STATUTORY TEXT: quote the relevant provision\n\
                        - PURPOSE: explain the policy rationale\n\
                        - INTERPRETATION: break down key terms and their legal meaning\n\
                        - CASE LAW: show how courts have applied the statute\n\
                        - APPLICATION: demonstrate how it applies in practice",
            reasoning: "Show progression from statutory text to practical application",
        },
    }
}

/// Framings rotated into case analysis prompts for scenario diversity
const SCENARIO_FRAMINGS: &[&str] = &[
    "Frame as a client's initial consultation question seeking legal guidance",
    "Frame as a question about specific procedural steps or tactical considerations",
    "Frame as a request for risk assessment or commercial legal advice",
    "Frame as a question about dispute resolution options and strategies",
    "Frame as a compliance or preventive legal guidance question",
];

/// Build the generation prompt for one work item and sample type
pub fn build_prompt(item: &WorkItem, sample_type: SampleType) -> String {
    let spec = DifficultySpec::for_level(item.difficulty);
    let guide = type_guide(sample_type);

    let context = match sample_type {
        SampleType::CaseAnalysis => SCENARIO_FRAMINGS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(guide.context),
        _ => guide.context,
    };

    format!(
        "You are a UK legal expert creating high-quality training data for an AI legal assistant.\n\
         \n\
         GENERATION TASK\n\
         Practice Area: {category}\n\
         Specific Topic: {subcategory}\n\
         Difficulty Level: {difficulty} ({description})\n\
         Sample Type: {title}\n\
         Type Objective: {objective}\n\
         Question Format: {question_format}\n\
         Context: {context}\n\
         \n\
         QUALITY STANDARDS\n\
         1. ANSWER STRUCTURE\n\
         {structure}\n\
         \n\
         2. ANSWER DEPTH: at least {min_words} words, complexity: {complexity}\n\
         \n\
         3. CITATIONS: at least {min_citations} distinct real UK authorities, formatted as\n\
         [Case Name] [Year] [Court] [Reporter] [Page], e.g. \"Carlill v Carbolic Smoke Ball [1893] 1 QB 256\".\n\
         Never fabricate cases or cite non-UK authorities.\n\
         \n\
         4. REASONING: {min_steps}-{max_steps} steps, each written as\n\
         \"Step N: [legal principle] -> [application to facts] -> [intermediate conclusion]\".\n\
         {reasoning}\n\
         \n\
         OUTPUT FORMAT\n\
         Return ONLY a valid JSON object, with no markdown and no extra text:\n\
         {{\n\
         \x20   \"question\": \"your generated question\",\n\
         \x20   \"answer\": \"your answer following the {sample_type} structure\",\n\
         \x20   \"reasoning\": \"Step 1: ... Step 2: ... (minimum {min_steps} steps)\",\n\
         \x20   \"case_citation\": \"real UK cases and statutes\",\n\
         \x20   \"topic\": \"{category} - {subcategory}\",\n\
         \x20   \"difficulty\": \"{difficulty}\",\n\
         \x20   \"sample_type\": \"{sample_type}\"\n\
         }}\n\
         \n\
         Generate NOW:",
        category = item.category,
        subcategory = item.subcategory,
        difficulty = item.difficulty,
        description = spec.description,
        title = guide.title,
        objective = guide.objective,
        question_format = guide.question_format,
        context = context,
        structure = guide.structure,
        min_words = spec.min_words,
        complexity = spec.complexity,
        min_citations = spec.min_citations,
        min_steps = spec.min_steps,
        max_steps = spec.max_steps,
        reasoning = guide.reasoning,
        sample_type = sample_type,
    )
}
