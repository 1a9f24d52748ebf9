use crate::models::ProductResult;

pub const CSV_HEADER: [&str; 12] = [
    "product_name", "product_link", "template_used", "title", "post_number", "post_content",
    "hashtags", "cta_options", "scheduling_suggestion", "disclosure", "image_url", "image_prompt",
];

/// Full-fidelity dump, one entry per product result.
pub fn to_json(results: &[ProductResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(results)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// One row per body segment, every field quoted.
pub fn to_csv(results: &[ProductResult]) -> String {
    let mut lines = vec![CSV_HEADER.join(",")];
    for result in results {
        for variant in &result.variants {
            for (index, segment) in variant.body.iter().enumerate() {
                let row = [
                    quote(&result.product.name),
                    quote(&result.product.link),
                    quote(&variant.template_label),
                    quote(&variant.title),
                    (index + 1).to_string(),
                    quote(segment),
                    quote(&variant.hashtags.join(", ")),
                    quote(&variant.cta_options.join("; ")),
                    quote(&variant.scheduling_suggestion),
                    quote(&variant.disclosure),
                    quote(variant.image_handle.as_deref().unwrap_or_default()),
                    quote(variant.image_prompt.as_deref().unwrap_or_default()),
                ];
                lines.push(row.join(","));
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentVariant, Product};
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<ProductResult> {
        let variant = ContentVariant {
            title: "The \"best\" fan".into(),
            body: vec!["First post".into(), "Second post".into()],
            hashtags: vec!["#fan".into(), "#summer".into()],
            cta_options: vec!["Buy".into(), "Look".into()],
            disclosure: "#Ad".into(),
            scheduling_suggestion: "Evening".into(),
            template_label: "Story".into(),
            image_prompt: Some("A fan".into()),
            image_handle: None,
            image_loading: false,
        };
        vec![ProductResult { product: Product::new("Fan", "Quiet", "https://shopee.vn/fan"), variants: vec![variant] }]
    }

    #[test]
    fn csv_has_one_row_per_segment() {
        let csv = to_csv(&sample());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            r##""Fan","https://shopee.vn/fan","Story","The ""best"" fan",1,"First post","#fan, #summer","Buy; Look","Evening","#Ad","","A fan""##
        );
        assert!(lines[2].contains(",2,\"Second post\","));
    }

    #[test]
    fn empty_results_export_header_only() {
        assert_eq!(to_csv(&[]), CSV_HEADER.join(","));
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn json_keeps_every_result() {
        let results = sample();
        let back: Vec<ProductResult> = serde_json::from_str(&to_json(&results).unwrap()).unwrap();
        assert_eq!(back, results);
    }
}
