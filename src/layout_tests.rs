#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::deadline::Deadline;
    use crate::layout::{generate_layout, render_attribute_value, LayoutOutput};
    use crate::mapping::{AttributeKind, AttributeRule, MappingTable};
    use crate::parse::{parse_layout, ComponentNode, PropertyValue};
    use crate::validate::{count_code, DIAG_MALFORMED_COMPONENT, DIAG_UNMAPPED_COMPONENT};

    fn table() -> MappingTable {
        MappingTable::builtin().unwrap()
    }

    fn generate(root: &ComponentNode) -> LayoutOutput {
        generate_layout("Screen1", root, &table(), &Deadline::none()).unwrap()
    }

    fn screen() -> ComponentNode {
        ComponentNode::new("Form", "Screen1")
    }

    fn attr(property: &str, kind: AttributeKind) -> AttributeRule {
        AttributeRule {
            property: property.to_string(),
            attribute: "android:x".to_string(),
            kind,
            unit: None,
            values: Default::default(),
        }
    }

    #[test]
    fn test_button_markup() {
        let root = screen().with_child(ComponentNode::new("Button", "Button1").with_property("Text", "Go"));
        let output = generate(&root);
        let expected = r#"<?xml version="1.0" encoding="utf-8"?>
<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:id="@+id/screen1"
    android:layout_width="match_parent"
    android:layout_height="match_parent"
    android:orientation="vertical">
    <Button
        android:id="@+id/button1"
        android:layout_width="wrap_content"
        android:layout_height="wrap_content"
        android:text="Go" />
</LinearLayout>
"#;
        assert_eq!(output.markup, expected);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_identical_input_identical_output() {
        let text = r#"{"Properties":{"$Name":"Screen1","$Type":"Form","$Components":[
            {"$Name":"Row","$Type":"HorizontalArrangement","$Components":[
                {"$Name":"Button1","$Type":"Button","Text":"A","FontSize":"18.0"},
                {"$Name":"Button2","$Type":"Button","Text":"B","BackgroundColor":"&HFF00FF00"}
            ]},
            {"$Name":"Label1","$Type":"Label","Text":"x","Visible":"False"},
            {"$Name":"Clock1","$Type":"Clock"}
        ]}}"#;
        let first = generate(&parse_layout("Screen1", text).unwrap().root);
        for _ in 0..5 {
            let again = generate(&parse_layout("Screen1", text).unwrap().root);
            assert_eq!(again.markup, first.markup);
            assert_eq!(again.diagnostics, first.diagnostics);
        }
    }

    #[test]
    fn test_every_mapped_type_round_trips() {
        let table = table();
        for (component_type, rule) in &table.components {
            if component_type == "Form" {
                continue;
            }
            let root = screen().with_child(ComponentNode::new(component_type, "Only1"));
            let output = generate_layout("Screen1", &root, &table, &Deadline::none()).unwrap();
            let open = format!("<{}\n", rule.target_tag);
            assert_eq!(
                output.markup.matches(&open).count(),
                1,
                "{} should emit exactly one <{}>",
                component_type,
                rule.target_tag
            );

            let start = output.markup.find(&open).unwrap();
            let element = &output.markup[start..];
            let element = &element[..element.find("/>").unwrap()];
            for attribute in &rule.property_to_attribute {
                if rule.default_properties.contains_key(&attribute.property) {
                    assert!(
                        element.contains(&format!("{}=\"", attribute.attribute)),
                        "{} is missing default attribute {}",
                        component_type,
                        attribute.attribute
                    );
                }
            }
            assert!(output.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_bare_form_round_trips() {
        let tree = parse_layout("Screen1", r#"{"Properties":{"$Name":"Screen1","$Type":"Form"}}"#).unwrap();
        let output = generate(&tree.root);
        let expected = r#"<?xml version="1.0" encoding="utf-8"?>
<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:id="@+id/screen1"
    android:layout_width="match_parent"
    android:layout_height="match_parent"
    android:orientation="vertical" />
"#;
        assert_eq!(output.markup, expected);
        assert!(output.diagnostics.is_empty());
        assert_eq!(output.registry.len(), 1);
        assert_eq!(output.registry.resolve("Screen1").map(|b| b.id.as_str()), Some("screen1"));
    }

    #[test]
    fn test_unmapped_node_skipped_with_one_diagnostic() {
        let root = screen()
            .with_child(ComponentNode::new("Button", "Button1"))
            .with_child(ComponentNode::new("Clock", "Clock1").with_property("TimerInterval", "1000"));
        let output = generate(&root);
        assert!(output.markup.contains("<Button\n"));
        assert!(!output.markup.contains("Clock"));
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(count_code(&output.diagnostics, DIAG_UNMAPPED_COMPONENT), 1);
        assert!(output.registry.resolve("Clock1").is_none());
        assert!(output.registry.resolve("Button1").is_some());
    }

    #[test]
    fn test_unmapped_subtree_is_dropped() {
        let root = screen().with_child(
            ComponentNode::new("TableArrangement", "Table1")
                .with_child(ComponentNode::new("Label", "Label1")),
        );
        let output = generate(&root);
        assert!(!output.markup.contains("TextView"));
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("1 nested component"));
    }

    #[test]
    fn test_unmapped_root_gets_fallback_container() {
        let root = ComponentNode::new("Canvas", "Screen1").with_child(ComponentNode::new("Label", "Label1"));
        let output = generate(&root);
        assert!(output
            .markup
            .contains("<LinearLayout xmlns:android=\"http://schemas.android.com/apk/res/android\"\n    android:id=\"@+id/root1\""));
        assert!(output.markup.contains("<TextView\n"));
        assert_eq!(count_code(&output.diagnostics, DIAG_UNMAPPED_COMPONENT), 1);
        assert_eq!(output.registry.resolve("Label1").unwrap().id, "label1");
    }

    #[test]
    fn test_attributes_follow_rule_order() {
        // Text is declared after the dimensions in the Button rule
        let root = screen().with_child(
            ComponentNode::new("Button", "Button1")
                .with_property("Text", "Go")
                .with_property("Width", "-2"),
        );
        let markup = generate(&root).markup;
        let width = markup.find("android:layout_width=\"match_parent\"\n        android:layout_height").unwrap();
        let text = markup.find("android:text=\"Go\"").unwrap();
        assert!(width < text);
    }

    #[test]
    fn test_node_values_win_over_defaults() {
        let root = screen().with_child(ComponentNode::new("CheckBox", "CheckBox1").with_property("Checked", "True"));
        let markup = generate(&root).markup;
        assert!(markup.contains("android:checked=\"true\""));
        assert!(!markup.contains("android:checked=\"false\""));
    }

    #[test]
    fn test_ids_are_sequential_and_registered() {
        let root = screen()
            .with_child(ComponentNode::new("Button", "Button1"))
            .with_child(ComponentNode::new("Button", "Button2"))
            .with_child(ComponentNode::new("Label", "Label1"));
        let output = generate(&root);
        assert!(output.markup.contains("@+id/button1"));
        assert!(output.markup.contains("@+id/button2"));
        assert!(output.markup.contains("@+id/label1"));
        let binding = output.registry.resolve("Button2").unwrap();
        assert_eq!(binding.id, "button2");
        assert_eq!(binding.java_type, "Button");
        assert_eq!(output.registry.len(), 4);
    }

    #[test]
    fn test_duplicate_instance_name_reported() {
        let root = screen()
            .with_child(ComponentNode::new("Button", "Button1"))
            .with_child(ComponentNode::new("Button", "Button1"));
        let output = generate(&root);
        assert_eq!(count_code(&output.diagnostics, DIAG_MALFORMED_COMPONENT), 1);
        assert_eq!(output.registry.resolve("Button1").unwrap().id, "button1");
    }

    #[test]
    fn test_attribute_values_escaped() {
        let root = screen().with_child(ComponentNode::new("Label", "Label1").with_property("Text", "Say \"hi\" & <go>"));
        let markup = generate(&root).markup;
        assert!(markup.contains("android:text=\"Say &quot;hi&quot; &amp; &lt;go&gt;\""));
    }

    #[test]
    fn test_value_transforms() {
        let dim = attr("Width", AttributeKind::Dimension);
        assert_eq!(render_attribute_value(&dim, &"-1".into()), "wrap_content");
        assert_eq!(render_attribute_value(&dim, &"-2".into()), "match_parent");
        assert_eq!(render_attribute_value(&dim, &"-1050".into()), "match_parent");
        assert_eq!(render_attribute_value(&dim, &PropertyValue::Number(120.0)), "120dp");

        let mut font = attr("FontSize", AttributeKind::Dimension);
        font.unit = Some("sp".to_string());
        assert_eq!(render_attribute_value(&font, &"14.0".into()), "14sp");

        let color = attr("TextColor", AttributeKind::Color);
        assert_eq!(render_attribute_value(&color, &"&HFFff0000".into()), "#FFFF0000");

        let flag = attr("Enabled", AttributeKind::Boolean);
        assert_eq!(render_attribute_value(&flag, &"True".into()), "true");
        assert_eq!(render_attribute_value(&flag, &PropertyValue::Bool(false)), "false");

        let picture = attr("Picture", AttributeKind::Drawable);
        assert_eq!(render_attribute_value(&picture, &"Kitty Cat.png".into()), "@drawable/kitty_cat");

        let mut visible = attr("Visible", AttributeKind::Plain);
        visible.values.insert("False".to_string(), "gone".to_string());
        assert_eq!(render_attribute_value(&visible, &PropertyValue::Bool(false)), "gone");
        assert_eq!(render_attribute_value(&visible, &"True".into()), "True");
    }
}
