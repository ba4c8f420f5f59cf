//! Static declaration of diffable fields per object kind
//!
//! Each kind declares the ordered list of fields that take part in the diff.
//! A [`Field`] knows its public name and how to read its value from an
//! object; the comparator is chosen from the value type.

use projsync_model::{
    JsonMap, Object, ObjectKind, Orchestration, Relations, SharedCodeConfig, SharedCodeRow,
    Transformation,
};

/// A diffable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Description,
    IsDefault,
    IsDisabled,
    Content,
    Relations,
    Orchestration,
    Transformation,
    SharedCode,
}

/// Value of a field, borrowed from an object
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Bool(bool),
    Text(&'a str),
    Map(&'a JsonMap),
    Relations(&'a Relations),
    Orchestration(Option<&'a Orchestration>),
    Transformation(Option<&'a Transformation>),
    SharedCodeConfig(Option<&'a SharedCodeConfig>),
    SharedCodeRow(Option<&'a SharedCodeRow>),
}

impl FieldValue<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
            Self::Map(_) => "map",
            Self::Relations(_) => "relations",
            Self::Orchestration(_) => "orchestration",
            Self::Transformation(_) => "transformation",
            Self::SharedCodeConfig(_) => "shared code config",
            Self::SharedCodeRow(_) => "shared code row",
        }
    }
}

const BRANCH_FIELDS: &[Field] = &[Field::Name, Field::Description, Field::IsDefault];

const CONFIG_FIELDS: &[Field] = &[
    Field::Name,
    Field::Description,
    Field::IsDisabled,
    Field::Content,
    Field::Relations,
    Field::Orchestration,
    Field::Transformation,
    Field::SharedCode,
];

const CONFIG_ROW_FIELDS: &[Field] = &[
    Field::Name,
    Field::Description,
    Field::IsDisabled,
    Field::Content,
    Field::Relations,
    Field::SharedCode,
];

/// Ordered diffable fields of a kind
pub fn fields_for(kind: ObjectKind) -> &'static [Field] {
    match kind {
        ObjectKind::Branch => BRANCH_FIELDS,
        ObjectKind::Config => CONFIG_FIELDS,
        ObjectKind::ConfigRow => CONFIG_ROW_FIELDS,
    }
}

impl Field {
    /// Public name used in changed fields and reports
    pub fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::IsDefault => "is_default",
            Self::IsDisabled => "is_disabled",
            Self::Content => "content",
            Self::Relations => "relations",
            Self::Orchestration => "orchestration",
            Self::Transformation => "transformation",
            Self::SharedCode => "shared_code",
        }
    }

    /// Read the field, `None` if the object's kind does not declare it
    pub fn value(self, object: &Object) -> Option<FieldValue<'_>> {
        let value = match (self, object) {
            (Self::Name, Object::Branch(o)) => FieldValue::Text(&o.name),
            (Self::Name, Object::Config(o)) => FieldValue::Text(&o.name),
            (Self::Name, Object::ConfigRow(o)) => FieldValue::Text(&o.name),
            (Self::Description, Object::Branch(o)) => FieldValue::Text(&o.description),
            (Self::Description, Object::Config(o)) => FieldValue::Text(&o.description),
            (Self::Description, Object::ConfigRow(o)) => FieldValue::Text(&o.description),
            (Self::IsDefault, Object::Branch(o)) => FieldValue::Bool(o.is_default),
            (Self::IsDisabled, Object::Config(o)) => FieldValue::Bool(o.is_disabled),
            (Self::IsDisabled, Object::ConfigRow(o)) => FieldValue::Bool(o.is_disabled),
            (Self::Content, Object::Config(o)) => FieldValue::Map(&o.content),
            (Self::Content, Object::ConfigRow(o)) => FieldValue::Map(&o.content),
            (Self::Relations, Object::Config(o)) => FieldValue::Relations(&o.relations),
            (Self::Relations, Object::ConfigRow(o)) => FieldValue::Relations(&o.relations),
            (Self::Orchestration, Object::Config(o)) => {
                FieldValue::Orchestration(o.orchestration.as_ref())
            }
            (Self::Transformation, Object::Config(o)) => {
                FieldValue::Transformation(o.transformation.as_ref())
            }
            (Self::SharedCode, Object::Config(o)) => {
                FieldValue::SharedCodeConfig(o.shared_code.as_ref())
            }
            (Self::SharedCode, Object::ConfigRow(o)) => {
                FieldValue::SharedCodeRow(o.shared_code.as_ref())
            }
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projsync_model::{Branch, Config, ConfigKey, ConfigRow};

    #[test]
    fn test_every_declared_field_is_readable() {
        let key = ConfigKey::new(1, "ex", "1");
        let objects: Vec<Object> = vec![
            Branch::new(1, "Main").into(),
            Config::new(&key, "Cfg").into(),
            ConfigRow::new(&key.row("1"), "Row").into(),
        ];

        for object in &objects {
            for field in fields_for(object.kind()) {
                assert!(
                    field.value(object).is_some(),
                    "{} declares {} but cannot read it",
                    object.kind(),
                    field.name()
                );
            }
        }
    }

    #[test]
    fn test_undeclared_field_is_none() {
        let branch: Object = Branch::new(1, "Main").into();
        assert!(Field::Content.value(&branch).is_none());
    }
}
