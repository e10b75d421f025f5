//! Marshal/unmarshal behaviour through hand-built templates

use csync_binding::{
    BindingTemplate, Error, Guard, Identity, ItemKind, Params, Presence, Target, ValueKind,
    marshal_to_string, parse_document, unmarshal, unmarshal_str,
};
use csync_model::{ContentHandle, ContentObject, ContentType, FieldValue, Fields};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn rule_template() -> BindingTemplate {
    BindingTemplate::new("rule.test", ContentType::Rule, "rule", |b| {
        b.attribute("key", Target::Key, ValueKind::Text, Presence::Required)
            .attribute(
                "folder",
                Target::Parent(Identity::Key),
                ValueKind::Text,
                Presence::Optional,
            )
            .element("name", Target::Name, ValueKind::Text, Presence::Required)
            .field("enabled", ValueKind::Bool, Presence::default_value(true))
            .field("weight", ValueKind::Int, Presence::Optional)
            .field("body", ValueKind::Markup, Presence::Optional)
            .element(
                "group",
                Target::Reference(ContentType::RuleGroup, Identity::Key),
                ValueKind::Text,
                Presence::Optional,
            )
            .repeated(
                Some("templates"),
                "template",
                Target::Reference(ContentType::Template, Identity::Key),
                ItemKind::Value(ValueKind::Text),
            )
            .repeated(
                Some("tags"),
                "tag",
                Target::field("tags"),
                ItemKind::Value(ValueKind::Text),
            )
            .nested("schedule", "schedule", false, |b| {
                b.attribute("cron", Target::field("cron"), ValueKind::Text, Presence::Required)
                    .field("timezone", ValueKind::Text, Presence::Optional)
            })
            .branch(Guard::version_at_least(9), |b| {
                b.attribute("priority", Target::field("priority"), ValueKind::Int, Presence::Optional)
                    .field("audit", ValueKind::Bool, Presence::Optional)
            })
    })
}

fn sample_rule() -> ContentObject {
    let mut rule = ContentObject::new(ContentHandle::with_key(ContentType::Rule, "/ops/escalate"));
    rule.set_name("Escalate");
    rule.set_parent(Some(ContentHandle::with_key(ContentType::Folder, "/ops")))
        .unwrap();
    rule.set_field("enabled", false);
    rule.set_field("weight", 5i64);
    rule.add_reference(ContentHandle::with_key(ContentType::RuleGroup, "/ops/critical"))
        .unwrap();
    rule.add_reference(ContentHandle::with_key(ContentType::Template, "/ops/mail"))
        .unwrap();
    rule.add_reference(ContentHandle::with_key(ContentType::Template, "/ops/sms"))
        .unwrap();
    rule.set_field(
        "tags",
        FieldValue::List(vec!["night".into(), "pager".into()]),
    );
    let mut schedule = Fields::new();
    schedule.insert("cron".into(), "0 * * * *".into());
    schedule.insert("timezone".into(), "UTC".into());
    rule.set_field("schedule", schedule);
    rule
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_round_trip_preserves_template_fields(#[case] pretty: bool) {
    let template = rule_template();
    let params = Params::for_version(8);
    let rule = sample_rule();

    let xml = marshal_to_string(&template, &rule, &params, pretty).unwrap();
    let back = unmarshal_str(&template, &xml, &params).unwrap();

    assert_eq!(back.handle().key(), Some("/ops/escalate"));
    assert_eq!(back.name(), Some("Escalate"));
    assert_eq!(back.parent().and_then(|p| p.key()), Some("/ops"));
    assert_eq!(back.references(), rule.references());
    assert_eq!(back.fields(), rule.fields());
}

#[test]
fn test_write_order_follows_declaration_order() {
    let template = rule_template();
    let xml = marshal_to_string(&template, &sample_rule(), &Params::for_version(8), false).unwrap();

    assert_eq!(
        xml,
        "<rule key=\"/ops/escalate\" folder=\"/ops\">\
         <name>Escalate</name>\
         <enabled>false</enabled>\
         <weight>5</weight>\
         <group>/ops/critical</group>\
         <templates><template>/ops/mail</template><template>/ops/sms</template></templates>\
         <tags><tag>night</tag><tag>pager</tag></tags>\
         <schedule cron=\"0 * * * *\"><timezone>UTC</timezone></schedule>\
         </rule>"
    );
}

#[test]
fn test_version_branch_writes_only_when_guard_holds() {
    let template = rule_template();
    let mut rule = sample_rule();
    rule.set_field("priority", 3i64);
    rule.set_field("audit", true);

    let old = marshal_to_string(&template, &rule, &Params::for_version(8), false).unwrap();
    assert!(!old.contains("priority"));
    assert!(!old.contains("<audit>"));

    let new = marshal_to_string(&template, &rule, &Params::for_version(9), false).unwrap();
    assert!(new.starts_with("<rule key=\"/ops/escalate\" folder=\"/ops\" priority=\"3\">"));
    assert!(new.ends_with("<audit>true</audit></rule>"));
}

#[rstest]
#[case("on", true)]
#[case("1", true)]
#[case("TRUE", true)]
#[case("off", false)]
#[case("0", false)]
fn test_boolean_tokens_coerce(#[case] token: &str, #[case] expected: bool) {
    let xml = format!("<rule key=\"/r\"><name>R</name><enabled>{token}</enabled></rule>");
    let rule = unmarshal_str(&rule_template(), &xml, &Params::new()).unwrap();
    assert_eq!(rule.bool("enabled"), Some(expected));
}

#[test]
fn test_optional_default_applies_when_absent() {
    let rule = unmarshal_str(
        &rule_template(),
        "<rule key=\"/r\"><name>R</name></rule>",
        &Params::new(),
    )
    .unwrap();
    assert_eq!(rule.bool("enabled"), Some(true));
    assert_eq!(rule.field("weight"), None);
    assert_eq!(rule.field("tags"), None);
}

#[test]
fn test_missing_required_names_template_and_path() {
    let err = unmarshal_str(&rule_template(), "<rule key=\"/r\"/>", &Params::new()).unwrap_err();
    match err {
        Error::MissingValue { template, path } => {
            assert_eq!(template, "rule.test");
            assert_eq!(path, "name");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_required_in_nested_record_reports_nested_path() {
    let xml = "<rule key=\"/r\"><name>R</name><schedule><timezone>UTC</timezone></schedule></rule>";
    let err = unmarshal_str(&rule_template(), xml, &Params::new()).unwrap_err();
    assert!(matches!(err, Error::MissingValue { ref path, .. } if path == "schedule/@cron"));
}

#[test]
fn test_invalid_integer_is_an_error() {
    let xml = "<rule key=\"/r\"><name>R</name><weight>heavy</weight></rule>";
    let err = unmarshal_str(&rule_template(), xml, &Params::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { expected: "integer", .. }));
}

#[test]
fn test_marshal_without_required_key_fails() {
    let mut rule = ContentObject::empty(ContentType::Rule);
    rule.set_name("Unsaved");
    let err = marshal_to_string(&rule_template(), &rule, &Params::new(), false).unwrap_err();
    assert!(matches!(err, Error::MissingValue { ref path, .. } if path == "@key"));
}

#[test]
fn test_embedded_markup_is_written_as_structure() {
    let mut rule = sample_rule();
    rule.set_field("body", "<p>Disk <b>full</b></p>");
    let xml = marshal_to_string(&rule_template(), &rule, &Params::new(), false).unwrap();
    assert!(xml.contains("<body><p>Disk <b>full</b></p></body>"));

    let back = unmarshal_str(&rule_template(), &xml, &Params::new()).unwrap();
    assert_eq!(back.text("body"), Some("<p>Disk <b>full</b></p>"));
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_space_between_inline_elements_survives(#[case] pretty: bool) {
    let mut rule = sample_rule();
    rule.set_field("body", "<p>a</p> <p>b</p>");
    let xml = marshal_to_string(&rule_template(), &rule, &Params::new(), pretty).unwrap();

    let back = unmarshal_str(&rule_template(), &xml, &Params::new()).unwrap();
    assert_eq!(back.text("body"), Some("<p>a</p> <p>b</p>"));
}

#[test]
fn test_unparseable_markup_falls_back_to_text() {
    let mut rule = sample_rule();
    rule.set_field("body", "<p>unclosed");
    let xml = marshal_to_string(&rule_template(), &rule, &Params::new(), false).unwrap();
    assert!(xml.contains("<body>&lt;p&gt;unclosed</body>"));

    let back = unmarshal_str(&rule_template(), &xml, &Params::new()).unwrap();
    assert_eq!(back.text("body"), Some("<p>unclosed"));
}

#[test]
fn test_root_mismatch() {
    let root = parse_document("<folder key=\"/a\"/>").unwrap();
    let err = unmarshal(&rule_template(), &root, &Params::new()).unwrap_err();
    assert!(matches!(err, Error::RootMismatch { .. }));
}

#[test]
fn test_malformed_input_names_template() {
    let err = unmarshal_str(&rule_template(), "<rule><name>", &Params::new()).unwrap_err();
    assert!(matches!(err, Error::Malformed { ref template, .. } if template == "rule.test"));
}

#[test]
fn test_prefixed_payload_binds_by_local_name() {
    let xml = "<ns:rule xmlns:ns=\"urn:content\" key=\"/r\"><ns:name>R</ns:name></ns:rule>";
    let rule = unmarshal_str(&rule_template(), xml, &Params::new()).unwrap();
    assert_eq!(rule.name(), Some("R"));
}

#[test]
fn test_namespace_param_overrides_template_namespace() {
    let template = BindingTemplate::new("folder.test", ContentType::Folder, "folder", |b| {
        b.attribute("key", Target::Key, ValueKind::Text, Presence::Required)
    })
    .with_namespace("urn:default");
    let folder = ContentObject::new(ContentHandle::with_key(ContentType::Folder, "/a"));

    let xml = marshal_to_string(&template, &folder, &Params::new(), false).unwrap();
    assert_eq!(xml, "<folder xmlns=\"urn:default\" key=\"/a\"></folder>");

    let params = Params::new().with("namespace", "urn:other");
    let xml = marshal_to_string(&template, &folder, &params, false).unwrap();
    assert_eq!(xml, "<folder xmlns=\"urn:other\" key=\"/a\"></folder>");
}

#[test]
fn test_param_default_is_read_from_bag() {
    let template = BindingTemplate::new("schedule.test", ContentType::Schedule, "schedule", |b| {
        b.attribute("key", Target::Key, ValueKind::Text, Presence::Required)
            .field("owner", ValueKind::Text, Presence::default_param("owner"))
    });
    let params = Params::new().with("owner", "ops");
    let schedule = unmarshal_str(&template, "<schedule key=\"/s\"/>", &params).unwrap();
    assert_eq!(schedule.text("owner"), Some("ops"));
}

#[test]
fn test_group_wraps_bindings_in_one_element() {
    let template = BindingTemplate::new("model.test", ContentType::MessageModel, "messageModel", |b| {
        b.attribute("id", Target::Id, ValueKind::Text, Presence::Required)
            .group("delivery", |b| {
                b.field("channel", ValueKind::Text, Presence::Required)
                    .field("retries", ValueKind::Int, Presence::Optional)
            })
    });
    let mut model = ContentObject::new(ContentHandle::with_id(ContentType::MessageModel, "42"));
    model.set_field("channel", "mail");
    model.set_field("retries", 2i64);

    let xml = marshal_to_string(&template, &model, &Params::new(), false).unwrap();
    assert_eq!(
        xml,
        "<messageModel id=\"42\"><delivery><channel>mail</channel><retries>2</retries></delivery></messageModel>"
    );
    let back = unmarshal_str(&template, &xml, &Params::new()).unwrap();
    assert_eq!(back.handle().id(), Some("42"));
    assert_eq!(back.fields(), model.fields());
}

#[test]
fn test_repeated_records() {
    let template = BindingTemplate::new("entry.test", ContentType::DirectoryEntryKind, "entryKind", |b| {
        b.attribute("key", Target::Key, ValueKind::Text, Presence::Required)
            .records(Some("attributes"), "attribute", "attributes", |b| {
                b.attribute("name", Target::field("name"), ValueKind::Text, Presence::Required)
                    .attribute("required", Target::field("required"), ValueKind::Bool, Presence::default_value(false))
            })
    });
    let xml = "<entryKind key=\"/person\"><attributes>\
               <attribute name=\"cn\" required=\"on\"/><attribute name=\"mail\"/>\
               </attributes></entryKind>";
    let entry = unmarshal_str(&template, xml, &Params::new()).unwrap();

    let records: Vec<(String, bool)> = entry
        .field("attributes")
        .and_then(FieldValue::as_list)
        .unwrap()
        .iter()
        .map(|r| {
            let r = r.as_record().unwrap();
            (
                r["name"].as_text().unwrap().to_string(),
                r["required"].as_bool().unwrap(),
            )
        })
        .collect();
    assert_eq!(records, vec![("cn".to_string(), true), ("mail".to_string(), false)]);
}

#[test]
fn test_type_mismatch_on_marshal() {
    let folder = ContentObject::new(ContentHandle::with_key(ContentType::Folder, "/a"));
    let err = marshal_to_string(&rule_template(), &folder, &Params::new(), false).unwrap_err();
    assert!(matches!(err, Error::Model(_)));
}
