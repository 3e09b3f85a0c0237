//! Admission rules for user input.
//!
//! A schema is a table of field rules: the key, the value kind with its bounds,
//! whether the field is required, and the message to report for each
//! constraint. One walker applies any table to untyped JSON and collects every
//! violation in schema order, so adding a resource means adding a table.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::ValidateEmail;

use crate::contract::model::{NewUser, UserId, UserPatch};

/// Largest integer an IEEE double represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub const INVALID_JSON: &str = "Request body must be valid JSON";
pub const NOT_AN_OBJECT: &str = "Request body must be a JSON object";

/// Which table [`validate`] should apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Create,
    Update,
    Identifier,
}

/// Constraint kinds a rule can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Required,
    Type,
    Empty,
    MinLength,
    MaxLength,
    Email,
    Number,
    Integer,
    Min,
    Max,
    Positive,
    Safe,
}

/// Ordered, human-readable violations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{}", .0.join("; "))]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

enum ValueKind {
    Text {
        min_chars: usize,
        max_chars: usize,
        email: bool,
    },
    Integer {
        min: Option<f64>,
        max: Option<f64>,
        positive: bool,
        safe: bool,
    },
}

struct FieldRule {
    key: &'static str,
    kind: ValueKind,
    required: bool,
    messages: &'static [(Constraint, &'static str)],
}

impl FieldRule {
    fn message(&self, constraint: Constraint) -> String {
        self.messages
            .iter()
            .find(|(c, _)| *c == constraint)
            .map(|(_, m)| (*m).to_string())
            .unwrap_or_else(|| format!("\"{}\" is invalid", self.key))
    }
}

struct ObjectSchema {
    fields: &'static [FieldRule],
    /// Reported when the input object carries no keys at all.
    at_least_one: Option<&'static str>,
}

const NAME_KIND: ValueKind = ValueKind::Text {
    min_chars: 2,
    max_chars: 100,
    email: false,
};

const EMAIL_KIND: ValueKind = ValueKind::Text {
    min_chars: 0,
    max_chars: 100,
    email: true,
};

const AGE_KIND: ValueKind = ValueKind::Integer {
    min: Some(1.0),
    max: Some(150.0),
    positive: false,
    safe: false,
};

const AGE_MESSAGES: &[(Constraint, &str)] = &[
    (Constraint::Required, "Age is required"),
    (Constraint::Number, "Age must be a number"),
    (Constraint::Integer, "Age must be a whole number"),
    (Constraint::Min, "Age must be at least 1"),
    (Constraint::Max, "Age must not exceed 150"),
];

static CREATE_SCHEMA: ObjectSchema = ObjectSchema {
    fields: &[
        FieldRule {
            key: "name",
            kind: NAME_KIND,
            required: true,
            messages: &[
                (Constraint::Required, "Name is required"),
                (Constraint::Type, "Name must be a string"),
                (Constraint::Empty, "Name is required"),
                (Constraint::MinLength, "Name must be at least 2 characters long"),
                (Constraint::MaxLength, "Name must not exceed 100 characters"),
            ],
        },
        FieldRule {
            key: "email",
            kind: EMAIL_KIND,
            required: true,
            messages: &[
                (Constraint::Required, "Email is required"),
                (Constraint::Type, "Email must be a string"),
                (Constraint::Empty, "Email is required"),
                (Constraint::Email, "Please provide a valid email address"),
                (Constraint::MaxLength, "Email must not exceed 100 characters"),
            ],
        },
        FieldRule {
            key: "age",
            kind: AGE_KIND,
            required: true,
            messages: AGE_MESSAGES,
        },
    ],
    at_least_one: None,
};

static UPDATE_SCHEMA: ObjectSchema = ObjectSchema {
    fields: &[
        FieldRule {
            key: "name",
            kind: NAME_KIND,
            required: false,
            messages: &[
                (Constraint::Type, "Name must be a string"),
                (Constraint::Empty, "Name cannot be empty"),
                (Constraint::MinLength, "Name must be at least 2 characters long"),
                (Constraint::MaxLength, "Name must not exceed 100 characters"),
            ],
        },
        FieldRule {
            key: "email",
            kind: EMAIL_KIND,
            required: false,
            messages: &[
                (Constraint::Type, "Email must be a string"),
                (Constraint::Empty, "Email cannot be empty"),
                (Constraint::Email, "Please provide a valid email address"),
                (Constraint::MaxLength, "Email must not exceed 100 characters"),
            ],
        },
        FieldRule {
            key: "age",
            kind: AGE_KIND,
            required: false,
            messages: AGE_MESSAGES,
        },
    ],
    at_least_one: Some("At least one field (name, email, or age) must be provided for update"),
};

static ID_RULE: FieldRule = FieldRule {
    key: "id",
    kind: ValueKind::Integer {
        min: None,
        max: None,
        positive: true,
        safe: true,
    },
    required: true,
    messages: &[
        (Constraint::Required, "ID is required"),
        (Constraint::Number, "ID must be a number"),
        (Constraint::Safe, "ID must be a safe number"),
        (Constraint::Integer, "ID must be a whole number"),
        (Constraint::Positive, "ID must be a positive number"),
    ],
};

#[derive(Deserialize)]
struct CreateFields {
    name: String,
    email: String,
    age: i32,
}

#[derive(Deserialize)]
struct UpdateFields {
    name: Option<String>,
    email: Option<String>,
    age: Option<i32>,
}

/// Validate a creation body. Every violation is reported, none short-circuits.
pub fn validate_create(raw: &Value) -> Result<NewUser, FieldErrors> {
    let fields: CreateFields = into_typed(validate(SchemaKind::Create, raw)?)?;
    Ok(NewUser {
        name: fields.name,
        email: fields.email,
        age: fields.age,
    })
}

/// Validate a partial update body. An object with no keys yields exactly the
/// "at least one field" message.
pub fn validate_update(raw: &Value) -> Result<UserPatch, FieldErrors> {
    let fields: UpdateFields = into_typed(validate(SchemaKind::Update, raw)?)?;
    Ok(UserPatch {
        name: fields.name,
        email: fields.email,
        age: fields.age,
    })
}

/// Validate a raw path segment as a user id. Only the first violation is
/// reported.
pub fn validate_identifier(raw: Option<&str>) -> Result<UserId, FieldErrors> {
    let raw = raw.map_or(Value::Null, |s| Value::String(s.to_string()));
    let id = validate(SchemaKind::Identifier, &raw)?;
    id.as_i64()
        .ok_or_else(|| FieldErrors::single(ID_RULE.message(Constraint::Number)))
}

/// Apply the table selected by `kind` to `raw`, returning the normalized value
/// (numeric strings coerced, unknown keys rejected). `Value::Null` stands for
/// absent input.
pub fn validate(kind: SchemaKind, raw: &Value) -> Result<Value, FieldErrors> {
    match kind {
        SchemaKind::Create => check_object(&CREATE_SCHEMA, raw).map(Value::Object),
        SchemaKind::Update => check_object(&UPDATE_SCHEMA, raw).map(Value::Object),
        SchemaKind::Identifier => check_identifier(raw),
    }
}

fn into_typed<T: DeserializeOwned>(value: Value) -> Result<T, FieldErrors> {
    serde_json::from_value(value).map_err(|e| FieldErrors::single(e.to_string()))
}

fn check_identifier(raw: &Value) -> Result<Value, FieldErrors> {
    let present = (!raw.is_null()).then_some(raw);
    match check_field(&ID_RULE, present) {
        Ok(Some(id)) => Ok(id),
        Ok(None) => Err(FieldErrors::single(ID_RULE.message(Constraint::Required))),
        Err(messages) => Err(FieldErrors(messages.into_iter().take(1).collect())),
    }
}

fn check_object(schema: &ObjectSchema, raw: &Value) -> Result<Map<String, Value>, FieldErrors> {
    let empty = Map::new();
    let input = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(FieldErrors::single(NOT_AN_OBJECT)),
    };

    let mut errors = Vec::new();
    let mut normalized = Map::new();

    for rule in schema.fields {
        match check_field(rule, input.get(rule.key)) {
            Ok(Some(value)) => {
                normalized.insert(rule.key.to_string(), value);
            }
            Ok(None) => {}
            Err(mut messages) => errors.append(&mut messages),
        }
    }

    errors.extend(
        input
            .keys()
            .filter(|key| !schema.fields.iter().any(|rule| rule.key == key.as_str()))
            .map(|key| format!("\"{key}\" is not allowed")),
    );

    if let Some(message) = schema.at_least_one {
        if input.is_empty() {
            errors.push(message.to_string());
        }
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(FieldErrors(errors))
    }
}

fn check_field(rule: &FieldRule, value: Option<&Value>) -> Result<Option<Value>, Vec<String>> {
    let Some(value) = value else {
        return if rule.required {
            Err(vec![rule.message(Constraint::Required)])
        } else {
            Ok(None)
        };
    };

    let checked = match rule.kind {
        ValueKind::Text {
            min_chars,
            max_chars,
            email,
        } => check_text(rule, value, min_chars, max_chars, email),
        ValueKind::Integer {
            min,
            max,
            positive,
            safe,
        } => check_integer(rule, value, min, max, positive, safe),
    };
    checked.map(Some)
}

fn check_text(
    rule: &FieldRule,
    value: &Value,
    min_chars: usize,
    max_chars: usize,
    email: bool,
) -> Result<Value, Vec<String>> {
    let Value::String(text) = value else {
        return Err(vec![rule.message(Constraint::Type)]);
    };
    if text.is_empty() {
        return Err(vec![rule.message(Constraint::Empty)]);
    }

    let chars = text.chars().count();
    let mut failed = Vec::new();
    if chars < min_chars {
        failed.push(rule.message(Constraint::MinLength));
    }
    if email && !is_email(text) {
        failed.push(rule.message(Constraint::Email));
    }
    if chars > max_chars {
        failed.push(rule.message(Constraint::MaxLength));
    }

    if failed.is_empty() {
        Ok(Value::String(text.clone()))
    } else {
        Err(failed)
    }
}

fn check_integer(
    rule: &FieldRule,
    value: &Value,
    min: Option<f64>,
    max: Option<f64>,
    positive: bool,
    safe: bool,
) -> Result<Value, Vec<String>> {
    let Some(number) = coerce_number(value) else {
        return Err(vec![rule.message(Constraint::Number)]);
    };
    if safe && number.abs() > MAX_SAFE_INTEGER {
        return Err(vec![rule.message(Constraint::Safe)]);
    }

    let mut failed = Vec::new();
    if number.fract() != 0.0 {
        failed.push(rule.message(Constraint::Integer));
    }
    if min.is_some_and(|min| number < min) {
        failed.push(rule.message(Constraint::Min));
    }
    if max.is_some_and(|max| number > max) {
        failed.push(rule.message(Constraint::Max));
    }
    if positive && number <= 0.0 {
        failed.push(rule.message(Constraint::Positive));
    }

    if failed.is_empty() {
        Ok(Value::from(number as i64))
    } else {
        Err(failed)
    }
}

/// JSON numbers pass through; strings are trimmed and parsed. Anything else,
/// and non-finite results, are not numbers.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Address syntax plus a domain of at least two non-empty labels.
fn is_email(candidate: &str) -> bool {
    if !candidate.validate_email() {
        return false;
    }
    candidate.rsplit_once('@').is_some_and(|(_, domain)| {
        let labels: Vec<&str> = domain.split('.').collect();
        labels.len() >= 2
            && labels.iter().all(|l| !l.is_empty())
            && labels.last().is_some_and(|tld| is_registered_tld(tld))
    })
}

/// The label must be a delegated top-level domain in the ICANN section of the
/// public suffix list; `invalid`, `test` and made-up labels are refused.
fn is_registered_tld(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    psl::suffix(label.as_bytes())
        .is_some_and(|suffix| suffix.is_known() && suffix.typ() == Some(psl::Type::Icann))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_errors(raw: Value) -> Vec<String> {
        validate_create(&raw).unwrap_err().into_messages()
    }

    fn update_errors(raw: Value) -> Vec<String> {
        validate_update(&raw).unwrap_err().into_messages()
    }

    #[test]
    fn accepts_valid_create_body() {
        let user = validate_create(&json!({"name": "Ada", "email": "ada@example.com", "age": 36}))
            .unwrap();
        assert_eq!(
            user,
            NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                age: 36
            }
        );
    }

    #[test]
    fn coerces_numeric_strings() {
        let user =
            validate_create(&json!({"name": "Ada", "email": "ada@example.com", "age": " 30 "}))
                .unwrap();
        assert_eq!(user.age, 30);

        let patch = validate_update(&json!({"age": "1e2"})).unwrap();
        assert_eq!(patch.age, Some(100));
    }

    #[test]
    fn empty_create_body_reports_every_required_field() {
        assert_eq!(
            create_errors(json!({})),
            vec!["Name is required", "Email is required", "Age is required"]
        );
        assert_eq!(
            validate_create(&Value::Null).unwrap_err().messages(),
            &["Name is required", "Email is required", "Age is required"]
        );
    }

    #[test]
    fn collects_all_violations_in_schema_order() {
        assert_eq!(
            create_errors(json!({"name": "A", "email": "bad", "age": 0})),
            vec![
                "Name must be at least 2 characters long",
                "Please provide a valid email address",
                "Age must be at least 1",
            ]
        );
    }

    #[test]
    fn long_invalid_email_reports_syntax_and_length() {
        let email = format!("{}@", "x".repeat(120));
        assert_eq!(
            create_errors(json!({"name": "Ada", "email": email, "age": 30})),
            vec![
                "Please provide a valid email address",
                "Email must not exceed 100 characters",
            ]
        );
    }

    #[test]
    fn empty_strings_report_only_the_empty_message() {
        assert_eq!(
            create_errors(json!({"name": "", "email": "", "age": 30})),
            vec!["Name is required", "Email is required"]
        );
        assert_eq!(
            update_errors(json!({"name": "", "email": ""})),
            vec!["Name cannot be empty", "Email cannot be empty"]
        );
    }

    #[test]
    fn wrong_types_are_reported() {
        assert_eq!(
            create_errors(json!({"name": 5, "email": null, "age": true})),
            vec![
                "Name must be a string",
                "Email must be a string",
                "Age must be a number",
            ]
        );
        assert_eq!(update_errors(json!({"age": "abc"})), vec!["Age must be a number"]);
        assert_eq!(update_errors(json!({"age": [1]})), vec!["Age must be a number"]);
    }

    #[test]
    fn age_bounds_and_fractions() {
        assert_eq!(update_errors(json!({"age": 151})), vec!["Age must not exceed 150"]);
        assert_eq!(
            update_errors(json!({"age": 0.5})),
            vec!["Age must be a whole number", "Age must be at least 1"]
        );
        assert_eq!(update_errors(json!({"age": 30.5})), vec!["Age must be a whole number"]);
        assert_eq!(validate_update(&json!({"age": 150})).unwrap().age, Some(150));
        assert_eq!(validate_update(&json!({"age": 1})).unwrap().age, Some(1));
    }

    #[test]
    fn name_length_counts_characters() {
        let name = "é".repeat(100);
        assert!(validate_update(&json!({ "name": name })).is_ok());
        let name = "é".repeat(101);
        assert_eq!(
            update_errors(json!({ "name": name })),
            vec!["Name must not exceed 100 characters"]
        );
        assert!(validate_update(&json!({"name": "Jo"})).is_ok());
    }

    #[test]
    fn unknown_keys_follow_field_errors_in_input_order() {
        assert_eq!(
            create_errors(json!({"zeta": 1, "name": "Ada", "alpha": 2, "email": "a@b.io", "age": 3})),
            vec!["\"zeta\" is not allowed", "\"alpha\" is not allowed"]
        );
        assert_eq!(
            update_errors(json!({"role": "admin", "age": 999})),
            vec!["Age must not exceed 150", "\"role\" is not allowed"]
        );
    }

    #[test]
    fn empty_update_yields_only_the_cross_field_message() {
        assert_eq!(
            update_errors(json!({})),
            vec!["At least one field (name, email, or age) must be provided for update"]
        );
        assert_eq!(
            validate_update(&Value::Null).unwrap_err().messages(),
            &["At least one field (name, email, or age) must be provided for update"]
        );
    }

    #[test]
    fn partial_update_keeps_absent_fields_unset() {
        let patch = validate_update(&json!({"age": 31})).unwrap();
        assert_eq!(
            patch,
            UserPatch {
                name: None,
                email: None,
                age: Some(31)
            }
        );
        assert!(!patch.is_empty());
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        assert_eq!(create_errors(json!([1, 2])), vec![NOT_AN_OBJECT]);
        assert_eq!(update_errors(json!("name")), vec![NOT_AN_OBJECT]);
    }

    #[test]
    fn identifier_violations_are_distinct() {
        let first = |raw: Option<&str>| validate_identifier(raw).unwrap_err().into_messages();
        assert_eq!(first(None), vec!["ID is required"]);
        assert_eq!(first(Some("abc")), vec!["ID must be a number"]);
        assert_eq!(first(Some("")), vec!["ID must be a number"]);
        assert_eq!(first(Some("1.5")), vec!["ID must be a whole number"]);
        assert_eq!(first(Some("-1")), vec!["ID must be a positive number"]);
        assert_eq!(first(Some("0")), vec!["ID must be a positive number"]);
        assert_eq!(first(Some("-1.5")), vec!["ID must be a whole number"]);
        assert_eq!(first(Some("9007199254740993")), vec!["ID must be a safe number"]);
    }

    #[test]
    fn identifier_accepts_positive_integers() {
        assert_eq!(validate_identifier(Some("42")), Ok(42));
        assert_eq!(validate_identifier(Some(" 7 ")), Ok(7));
        assert_eq!(validate_identifier(Some("9007199254740991")), Ok(9_007_199_254_740_991));
    }

    #[test]
    fn generic_dispatcher_normalizes_values() {
        let normalized = validate(
            SchemaKind::Create,
            &json!({"name": "Ada", "email": "ada@example.com", "age": "40"}),
        )
        .unwrap();
        assert_eq!(normalized, json!({"name": "Ada", "email": "ada@example.com", "age": 40}));
        assert_eq!(validate(SchemaKind::Identifier, &json!(12)).unwrap(), json!(12));
        assert_eq!(
            validate(SchemaKind::Identifier, &Value::Null).unwrap_err(),
            FieldErrors::single("ID is required")
        );
    }

    #[test]
    fn email_domain_needs_two_labels() {
        assert!(is_email("user@example.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("user@localhost"));
        assert!(!is_email("user@example."));
        assert!(!is_email("user.example.com"));
        assert!(!is_email("bad"));
    }

    #[test]
    fn email_domain_must_end_in_a_registered_tld() {
        assert!(is_email("user@example.museum"));
        assert!(is_email("user@Example.COM"));
        assert!(is_email("a@b.io"));
        assert!(!is_email("user@example.invalid"));
        assert!(!is_email("ann@example.test"));
        assert!(!is_email("a@b.c"));

        assert_eq!(
            create_errors(json!({"name": "Ann", "email": "ann@example.invalid", "age": 30})),
            vec!["Please provide a valid email address"]
        );
        assert_eq!(
            update_errors(json!({"email": "a@b.c"})),
            vec!["Please provide a valid email address"]
        );
    }

    #[test]
    fn field_errors_display_joins_messages() {
        let errors = FieldErrors(vec!["a".into(), "b".into()]);
        assert_eq!(errors.to_string(), "a; b");
        assert!(!errors.is_empty());
    }
}
