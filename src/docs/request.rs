//! Edit requests in the document service's batch-update wire shape.

use serde::{Deserialize, Serialize};

use crate::patch::PatchOperation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    InsertText(InsertText),
    UpdateTextStyle(UpdateTextStyle),
    DeleteContentRange(DeleteContentRange),
    ReplaceAllText(ReplaceAllText),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertText {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocRange {
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyle {
    pub range: DocRange,
    pub text_style: TextStyle,
    /// Comma-separated names of the attributes this update touches.
    pub fields: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteContentRange {
    pub range: DocRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAllText {
    pub contains_text: SubstringMatchCriteria,
    pub replace_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstringMatchCriteria {
    pub text: String,
    pub match_case: bool,
}

impl Request {
    pub fn insert_text(index: usize, text: impl Into<String>) -> Self {
        Request::InsertText(InsertText {
            location: Location { index },
            text: text.into(),
        })
    }

    pub fn delete_range(start_index: usize, end_index: usize) -> Self {
        Request::DeleteContentRange(DeleteContentRange {
            range: DocRange {
                start_index,
                end_index,
            },
        })
    }

    /// Case-sensitive replacement of every occurrence of `find`.
    pub fn replace_all(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Request::ReplaceAllText(ReplaceAllText {
            contains_text: SubstringMatchCriteria {
                text: find.into(),
                match_case: true,
            },
            replace_text: replace.into(),
        })
    }
}

impl From<PatchOperation> for Request {
    fn from(op: PatchOperation) -> Self {
        match op {
            PatchOperation::InsertText { offset, text } => Request::insert_text(offset, text),
            PatchOperation::UpdateStyle {
                range,
                style,
                fields,
            } => {
                let fields = fields
                    .iter()
                    .map(|field| field.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                Request::UpdateTextStyle(UpdateTextStyle {
                    range: DocRange {
                        start_index: range.start,
                        end_index: range.end,
                    },
                    text_style: TextStyle {
                        bold: style.bold.then_some(true),
                        italic: style.italic.then_some(true),
                        link: style.link.map(|url| Link { url }),
                    },
                    fields,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest<'a> {
    pub requests: &'a [Request],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_all_text: Option<ReplaceAllTextReply>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAllTextReply {
    #[serde(default)]
    pub occurrences_changed: usize,
}

impl BatchUpdateResponse {
    /// `occurrencesChanged` of the reply at `idx`, if that reply was a replace-all.
    pub fn occurrences_changed(&self, idx: usize) -> Option<usize> {
        self.replies
            .get(idx)?
            .replace_all_text
            .map(|reply| reply.occurrences_changed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::patch::StyleField;
    use crate::style::StyleAttrs;

    #[test]
    fn style_update_serializes_only_touched_attributes() {
        let request = Request::from(PatchOperation::UpdateStyle {
            range: 10..19,
            style: StyleAttrs {
                bold: true,
                ..StyleAttrs::default()
            },
            fields: vec![StyleField::Bold],
        });

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "updateTextStyle": {
                    "range": { "startIndex": 10, "endIndex": 19 },
                    "textStyle": { "bold": true },
                    "fields": "bold"
                }
            })
        );
    }

    #[test]
    fn link_update_carries_url_and_joined_fields() {
        let request = Request::from(PatchOperation::UpdateStyle {
            range: 0..5,
            style: StyleAttrs {
                bold: false,
                italic: true,
                link: Some("https://enova.com".to_owned()),
            },
            fields: vec![StyleField::Italic, StyleField::Link],
        });

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value.pointer("/updateTextStyle/textStyle/link/url"),
            Some(&json!("https://enova.com"))
        );
        assert_eq!(
            value.pointer("/updateTextStyle/fields"),
            Some(&json!("italic,link"))
        );
    }

    #[test]
    fn replace_all_and_delete_match_service_shape() {
        let requests = vec![
            Request::replace_all("{{Key}}", "__REPLACEKey__"),
            Request::delete_range(5, 19),
            Request::insert_text(5, "x"),
        ];
        let body = serde_json::to_value(BatchUpdateRequest {
            requests: &requests,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "requests": [
                    { "replaceAllText": {
                        "containsText": { "text": "{{Key}}", "matchCase": true },
                        "replaceText": "__REPLACEKey__"
                    } },
                    { "deleteContentRange": { "range": { "startIndex": 5, "endIndex": 19 } } },
                    { "insertText": { "location": { "index": 5 }, "text": "x" } }
                ]
            })
        );
    }

    #[test]
    fn batch_response_reports_occurrences_per_reply() {
        let response: BatchUpdateResponse = serde_json::from_value(json!({
            "documentId": "d",
            "replies": [ { "replaceAllText": { "occurrencesChanged": 2 } }, {} ]
        }))
        .unwrap();
        assert_eq!(response.occurrences_changed(0), Some(2));
        assert_eq!(response.occurrences_changed(1), None);
        assert_eq!(response.occurrences_changed(9), None);
    }
}
