//! `-var-update` changelist entries

use super::value::ResultValue;

/// Scope state of a variable object after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InScope {
    Yes,
    No,
    /// The expression can no longer be evaluated (e.g. its frame is gone)
    Invalid,
}

/// One entry of a `-var-update` changelist
#[derive(Debug, Clone)]
pub struct UpdatedVariable {
    pub name: String,
    pub value: Option<String>,
    pub in_scope: InScope,
    pub type_changed: bool,
    /// Present when the child count of a dynamic varobj changed
    pub new_num_children: Option<i32>,
    pub dynamic: bool,
    pub has_more: bool,
}

impl UpdatedVariable {
    /// Parse one changelist element. Returns `None` when the `name` field
    /// is missing, which would make the entry unroutable.
    pub fn parse(value: &ResultValue) -> Option<UpdatedVariable> {
        let name = value.string_of("name")?.to_string();
        let in_scope = match value.string_of("in_scope") {
            Some("false") => InScope::No,
            Some("invalid") => InScope::Invalid,
            // gdb omits in_scope for some entries; treat those as live.
            _ => InScope::Yes,
        };
        Some(UpdatedVariable {
            name,
            value: value.string_of("value").map(str::to_string),
            in_scope,
            type_changed: value.string_of("type_changed") == Some("true"),
            new_num_children: value.int_of("new_num_children").map(|n| n as i32),
            dynamic: value.bool_flag("dynamic"),
            has_more: value.bool_flag("has_more"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::value::parse_value;
    use super::*;

    #[test]
    fn plain_value_change() {
        let element =
            parse_value("name=\"var1.x\",value=\"42\",in_scope=\"true\",type_changed=\"false\"")
                .unwrap();
        let updated = UpdatedVariable::parse(&element).unwrap();
        assert_eq!(updated.name, "var1.x");
        assert_eq!(updated.value.as_deref(), Some("42"));
        assert_eq!(updated.in_scope, InScope::Yes);
        assert!(!updated.type_changed);
    }

    #[test]
    fn out_of_scope() {
        let element = parse_value("name=\"var2\",in_scope=\"false\"").unwrap();
        let updated = UpdatedVariable::parse(&element).unwrap();
        assert_eq!(updated.in_scope, InScope::No);
        assert!(updated.value.is_none());
    }

    #[test]
    fn invalid_scope() {
        let element = parse_value("name=\"var2\",in_scope=\"invalid\"").unwrap();
        assert_eq!(UpdatedVariable::parse(&element).unwrap().in_scope, InScope::Invalid);
    }

    #[test]
    fn dynamic_growth() {
        let element = parse_value(
            "name=\"var3\",in_scope=\"true\",new_num_children=\"12\",dynamic=\"1\",has_more=\"1\"",
        )
        .unwrap();
        let updated = UpdatedVariable::parse(&element).unwrap();
        assert!(updated.dynamic);
        assert!(updated.has_more);
        assert_eq!(updated.new_num_children, Some(12));
    }

    #[test]
    fn nameless_entry_is_dropped() {
        let element = parse_value("value=\"9\"").unwrap();
        assert!(UpdatedVariable::parse(&element).is_none());
    }
}
