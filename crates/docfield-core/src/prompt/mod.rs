//! Prompt construction: schema and document content into an inference request.

pub mod templates;

pub use templates::{PromptTemplate, WorkedExample};

use docfield_inference::{DecodingOptions, InferenceRequest};
use serde_json::Value;

use crate::models::schema::ExtractionSchema;
use crate::pdf::DocumentContent;

/// Builds inference requests for one schema.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema: ExtractionSchema,
    template: PromptTemplate,
    line_filter: Option<Vec<String>>,
}

impl PromptBuilder {
    /// Create a builder using the template matching the schema.
    pub fn new(schema: ExtractionSchema) -> Self {
        let template = match schema.name() {
            "payroll" => PromptTemplate::payroll(),
            "invoice" => PromptTemplate::invoice(),
            _ => PromptTemplate::generic(schema.has_two_column_fields()),
        };
        Self {
            schema,
            template,
            line_filter: None,
        }
    }

    /// Replace the template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Only embed header lines containing one of these keywords.
    pub fn with_line_filter(mut self, keywords: Option<Vec<String>>) -> Self {
        self.line_filter = keywords;
        self
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    /// The schema as a pretty JSON object with every value empty.
    pub fn skeleton(&self) -> String {
        // A map of strings always serializes
        serde_json::to_string_pretty(&Value::Object(self.schema.skeleton())).unwrap_or_default()
    }

    /// Prompt text, with the document text embedded for text content.
    pub fn prompt_text(&self, content: &DocumentContent) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!("{}\n\n", self.template.intro));

        prompt.push_str("INSTRUÇÕES:\n");
        for (i, rule) in self.template.rules.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, rule));
        }

        if !self.template.examples.is_empty() {
            prompt.push_str("\nEXEMPLOS:\n");
            for example in &self.template.examples {
                prompt.push_str(&format!("Entrada: {}\nSaída: {}\n", example.input, example.output));
            }
        }

        prompt.push_str(&format!("\n{}\n{}\n", templates::JSON_ONLY, self.skeleton()));

        if let DocumentContent::StructuredText(text) = content {
            let text = match &self.line_filter {
                Some(keywords) => text.filter_lines(keywords),
                None => text.clone(),
            };
            prompt.push_str(&format!("\n{}\n{}", templates::TEXT_INTRO, text.render()));
        }

        prompt
    }

    /// Build the request for one document.
    pub fn build(&self, content: &DocumentContent, model: &str, options: &DecodingOptions) -> InferenceRequest {
        let request = InferenceRequest::new(model, self.prompt_text(content)).with_options(options.clone());
        match content {
            DocumentContent::Image(page) => request.with_image(page.png.clone()),
            DocumentContent::StructuredText(_) => request,
        }
    }
}
