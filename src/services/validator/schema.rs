//! 提交字段声明

use serde_json::Value as JsonValue;

/// 字段的声明类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    String,
    Boolean,
    StringArray,
    Object,
}

impl FieldShape {
    pub fn name(self) -> &'static str {
        match self {
            FieldShape::String => "string",
            FieldShape::Boolean => "boolean",
            FieldShape::StringArray => "array",
            FieldShape::Object => "object",
        }
    }

    pub fn matches(self, value: &JsonValue) -> bool {
        match self {
            FieldShape::String => value.is_string(),
            FieldShape::Boolean => value.is_boolean(),
            FieldShape::StringArray => value.is_array(),
            FieldShape::Object => value.is_object(),
        }
    }
}

/// 字段声明
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: FieldShape,
    pub required: bool,
    /// 字符数范围（字符串或数组中的每个元素）
    pub min_len: usize,
    pub max_len: usize,
}

const fn field(
    name: &'static str,
    shape: FieldShape,
    required: bool,
    min_len: usize,
    max_len: usize,
) -> FieldSpec {
    FieldSpec {
        name,
        shape,
        required,
        min_len,
        max_len,
    }
}

/// 自由文本字段上限
pub const FREE_TEXT_MAX: usize = 20_000;

/// 行业标签数量上限
pub const MAX_INDUSTRY_TAGS: usize = 10;

/// 按校验顺序排列的字段声明
pub const FIELD_SPECS: &[FieldSpec] = &[
    field("companyName", FieldShape::String, true, 2, 200),
    field("contactName", FieldShape::String, true, 1, 100),
    field("email", FieldShape::String, true, 3, 254),
    field("consent", FieldShape::Boolean, true, 0, 0),
    field("contactPhone", FieldShape::String, false, 1, 30),
    field("jobTitle", FieldShape::String, false, 1, 100),
    field("industry", FieldShape::StringArray, false, 1, 100),
    field("employeeCount", FieldShape::String, false, 1, 20),
    field("challenges", FieldShape::String, false, 0, FREE_TEXT_MAX),
    field("goals", FieldShape::String, false, 0, FREE_TEXT_MAX),
    field("submittedAt", FieldShape::String, false, 1, 64),
    field("submissionId", FieldShape::String, false, 1, 128),
    field("scores", FieldShape::Object, false, 0, 0),
];

pub fn spec_for(name: &str) -> Option<&'static FieldSpec> {
    FIELD_SPECS.iter().find(|s| s.name == name)
}

/// JSON 值的类型名
pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_f64() => "number",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields() {
        let required: Vec<_> = FIELD_SPECS
            .iter()
            .filter(|s| s.required)
            .map(|s| s.name)
            .collect();
        assert_eq!(
            required,
            vec!["companyName", "contactName", "email", "consent"]
        );
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(3)), "integer");
        assert_eq!(json_type_name(&json!(3.5)), "number");
        assert_eq!(json_type_name(&json!("x")), "string");
        assert_eq!(json_type_name(&json!(null)), "null");
    }
}
