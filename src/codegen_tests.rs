#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::blocks::parse_blocks;
    use crate::codegen::{compile_program, escape_java, CompiledSource};
    use crate::deadline::Deadline;
    use crate::layout::generate_layout;
    use crate::mapping::MappingTable;
    use crate::parse::parse_layout;
    use crate::validate::{
        count_code, DIAG_IGNORED_BLOCK, DIAG_INVALID_LITERAL, DIAG_MISPLACED_BLOCK,
        DIAG_MISSING_VALUE, DIAG_OPAQUE_BLOCK, DIAG_UNMAPPED_EVENT, DIAG_UNRESOLVED_REFERENCE,
    };
    use crate::ConvertOptions;

    const LAYOUT: &str = r#"{"Properties":{"$Name":"Screen1","$Type":"Form","$Components":[
        {"$Name":"Button1","$Type":"Button","Text":"Go"},
        {"$Name":"Label1","$Type":"Label"},
        {"$Name":"TextBox1","$Type":"TextBox"},
        {"$Name":"Slider1","$Type":"Slider"}
    ]}}"#;

    fn compile_with(table: &MappingTable, layout: &str, blocks: &str) -> CompiledSource {
        let tree = parse_layout("Screen1", layout).unwrap();
        let markup = generate_layout("Screen1", &tree.root, table, &Deadline::none()).unwrap();
        let program = parse_blocks("Screen1", blocks).unwrap();
        compile_program(
            "Screen1",
            &program,
            &markup.registry,
            table,
            &ConvertOptions::default(),
            &Deadline::none(),
        )
        .unwrap()
    }

    fn compile(blocks: &str) -> CompiledSource {
        compile_with(&MappingTable::builtin().unwrap(), LAYOUT, blocks)
    }

    fn on(instance: &str, component_type: &str, event: &str, body: &str) -> String {
        format!(
            r#"<xml><block type="component_event" id="h1"><mutation component_type="{}" instance_name="{}" event_name="{}"></mutation><statement name="DO">{}</statement></block></xml>"#,
            component_type, instance, event, body
        )
    }

    fn click(body: &str) -> String {
        on("Button1", "Button", "Click", body)
    }

    fn set_text(instance: &str, value: &str) -> String {
        format!(
            r#"<block type="component_set_get" id="set-{i}"><mutation component_type="Label" set_or_get="set" property_name="Text" instance_name="{i}"></mutation><value name="VALUE">{v}</value></block>"#,
            i = instance,
            v = value
        )
    }

    fn then(first: &str, second: &str) -> String {
        // splice `second` in as the <next> of `first`
        let at = first.rfind("</block>").unwrap();
        format!("{}<next>{}</next></block>", &first[..at], second)
    }

    fn num(n: &str) -> String {
        format!(r#"<block type="math_number"><field name="NUM">{}</field></block>"#, n)
    }

    fn text(t: &str) -> String {
        format!(r#"<block type="text"><field name="TEXT">{}</field></block>"#, t)
    }

    fn get(name: &str) -> String {
        format!(r#"<block type="lexical_variable_get" id="get-{n}"><field name="VAR">{n}</field></block>"#, n = name)
    }

    fn binary(block_type: &str, a: &str, b: &str) -> String {
        format!(
            r#"<block type="{}"><value name="A">{}</value><value name="B">{}</value></block>"#,
            block_type, a, b
        )
    }

    fn multiply(a: &str, b: &str) -> String {
        format!(
            r#"<block type="math_multiply"><mutation items="2"></mutation><value name="NUM0">{}</value><value name="NUM1">{}</value></block>"#,
            a, b
        )
    }

    fn local(name: &str, init: &str, stack: &str) -> String {
        format!(
            r#"<block type="local_declaration_statement" id="local-{n}"><mutation><localname name="{n}"></localname></mutation><field name="VAR0">{n}</field><value name="DECL0">{i}</value><statement name="STACK">{s}</statement></block>"#,
            n = name,
            i = init,
            s = stack
        )
    }

    #[test]
    fn test_click_sets_label() {
        let out = compile(&click(&set_text("Label1", &text("Clicked"))));
        let expected = r#"package com.example.app;

import android.os.Bundle;
import android.view.View;
import android.widget.*;
import androidx.appcompat.app.AppCompatActivity;

public class Screen1 extends AppCompatActivity {

    private Button button1;
    private TextView label1;

    @Override
    protected void onCreate(Bundle savedInstanceState) {
        super.onCreate(savedInstanceState);
        setContentView(R.layout.activity_screen1);
        button1 = findViewById(R.id.button1);
        label1 = findViewById(R.id.label1);
        bindEvents();
    }

    private void bindEvents() {
        button1.setOnClickListener(v -> {
            label1.setText("Clicked");
        });
    }
}
"#;
        assert_eq!(out.source, expected);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.class_name, "Screen1");
    }

    #[test]
    fn test_evaluation_order_is_parenthesized() {
        let left = multiply(&binary("math_subtract", &num("1"), &num("2")), &num("3"));
        let right = binary("math_subtract", &num("1"), &multiply(&num("2"), &num("3")));
        let body = then(&set_text("Label1", &left), &set_text("Label1", &right));
        let out = compile(&click(&body));
        assert!(out.source.contains("label1.setText(String.valueOf(((1 - 2) * 3)));"));
        assert!(out.source.contains("label1.setText(String.valueOf((1 - (2 * 3))));"));
    }

    #[test]
    fn test_local_scope_and_single_unresolved_reference() {
        let inner = set_text("Label1", &get("x"));
        let body = then(&local("x", &num("5"), &inner), &then(&set_text("Label1", &get("x")), &set_text("Label1", &get("y"))));
        let out = compile(&click(&body));
        assert!(out.source.contains("            double x = 5;\n"));
        assert_eq!(out.source.matches("label1.setText(String.valueOf(x));").count(), 2);
        assert!(out.source.contains("label1.setText(String.valueOf(null /* unresolved: y */));"));
        assert_eq!(count_code(&out.diagnostics, DIAG_UNRESOLVED_REFERENCE), 1);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].context.as_deref(), Some("get-y"));
    }

    #[test]
    fn test_reference_before_declaration_is_unresolved() {
        let early = r#"<block type="lexical_variable_get" id="early-x"><field name="VAR">x</field></block>"#;
        let declared = local("x", &num("5"), &set_text("Label1", &get("x")));
        let out = compile(&click(&then(&set_text("Label1", early), &declared)));
        assert_eq!(out.source.matches("null /* unresolved: x */").count(), 1);
        assert_eq!(out.source.matches("label1.setText(String.valueOf(x));").count(), 1);
        assert_eq!(count_code(&out.diagnostics, DIAG_UNRESOLVED_REFERENCE), 1);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].context.as_deref(), Some("early-x"));
    }

    #[test]
    fn test_nested_shadowing_gets_fresh_name() {
        let inner = local("x", &text("inner"), &set_text("Label1", &get("x")));
        let body = local("x", &num("1"), &then(&inner, &set_text("Label1", &get("x"))));
        let out = compile(&click(&body));
        assert!(out.source.contains("double x = 1;"));
        assert!(out.source.contains("String x_2 = \"inner\";"));
        assert!(out.source.contains("label1.setText(String.valueOf(x_2));"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_initializer_sees_outer_binding() {
        let plus = format!(
            r#"<block type="math_add"><mutation items="2"></mutation><value name="NUM0">{}</value><value name="NUM1">{}</value></block>"#,
            get("x"),
            num("1")
        );
        let inner = local("x", &plus, &set_text("Label1", &get("x")));
        let out = compile(&click(&local("x", &num("1"), &inner)));
        assert!(out.source.contains("double x_2 = (x + 1);"));
    }

    #[test]
    fn test_sibling_loops_reuse_variable_name() {
        let range = |step: &str| {
            format!(
                r#"<block type="controls_forRange"><field name="VAR">i</field><value name="START">{}</value><value name="END">{}</value><value name="STEP">{}</value><statement name="DO">{}</statement></block>"#,
                num("1"),
                num("5"),
                num(step),
                set_text("Label1", &get("i"))
            )
        };
        let out = compile(&click(&then(&range("1"), &range("-1"))));
        assert!(out.source.contains("            for (double i = 1; i <= 5; i += 1) {\n                label1.setText(String.valueOf(i));\n            }\n"));
        assert!(out.source.contains("for (double i = 1; i >= 5; i += -1) {"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_if_else() {
        let body = format!(
            r#"<block type="controls_if"><mutation else="1"></mutation><value name="IF0"><block type="logic_boolean"><field name="BOOL">TRUE</field></block></value><statement name="DO0">{}</statement><statement name="ELSE">{}</statement></block>"#,
            set_text("Label1", &text("a")),
            set_text("Label1", &text("b"))
        );
        let out = compile(&click(&body));
        let expected = "            if (true) {\n                label1.setText(\"a\");\n            } else {\n                label1.setText(\"b\");\n            }\n";
        assert!(out.source.contains(expected), "{}", out.source);
    }

    #[test]
    fn test_else_if_chain() {
        let body = format!(
            r#"<block type="controls_if"><mutation elseif="1"></mutation><value name="IF0">{}</value><statement name="DO0">{}</statement><value name="IF1">{}</value><statement name="DO1">{}</statement></block>"#,
            binary("math_compare", &num("1"), &num("2")).replace("<value", r#"<field name="OP">LT</field><value"#),
            set_text("Label1", &text("a")),
            binary("logic_compare", &text("x"), &text("y")).replace("<value", r#"<field name="OP">EQ</field><value"#),
            set_text("Label1", &text("b"))
        );
        let out = compile(&click(&body));
        assert!(out.source.contains("if ((1 < 2)) {"));
        assert!(out.source.contains("} else if (java.util.Objects.equals(\"x\", \"y\")) {"));
    }

    #[test]
    fn test_event_parameters_seeded() {
        let body = set_text("Label1", &get("thumbPosition"));
        let out = compile(&on("Slider1", "Slider", "PositionChanged", &body));
        let expected = "        slider1.addOnChangeListener((slider, value, fromUser) -> {\n            var thumbPosition = value;\n            label1.setText(String.valueOf(thumbPosition));\n        });\n";
        assert!(out.source.contains(expected), "{}", out.source);
        assert!(out.source.contains("private com.google.android.material.slider.Slider slider1;"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_event_parameters_do_not_leak_between_handlers() {
        let slider = on("Slider1", "Slider", "PositionChanged", "");
        let button = click(&set_text("Label1", &get("thumbPosition")));
        let both = slider.replace("</xml>", "") + &button.replace("<xml>", "");
        let out = compile(&both);
        assert_eq!(count_code(&out.diagnostics, DIAG_UNRESOLVED_REFERENCE), 1);
    }

    #[test]
    fn test_long_click_returns_value() {
        let out = compile(&on("Button1", "Button", "LongClick", ""));
        assert!(out.source.contains("        button1.setOnLongClickListener(v -> {\n            return true;\n        });\n"));
    }

    #[test]
    fn test_setter_coercion() {
        let font = r#"<block type="component_set_get"><mutation component_type="Button" set_or_get="set" property_name="FontSize" instance_name="Button1"></mutation><value name="VALUE"><block type="math_number"><field name="NUM">18</field></block></value></block>"#;
        let out = compile(&click(font));
        assert!(out.source.contains("button1.setTextSize((float) 18);"));
    }

    #[test]
    fn test_property_get_uses_accessor() {
        let getter = r#"<block type="component_set_get"><mutation component_type="TextBox" set_or_get="get" property_name="Text" instance_name="TextBox1"></mutation></block>"#;
        let out = compile(&click(&set_text("Label1", getter)));
        assert!(out.source.contains("label1.setText(String.valueOf(textBox1.getText().toString()));"));
        assert!(out.source.contains("private EditText textBox1;"));
    }

    #[test]
    fn test_method_arguments_keep_order() {
        let call = format!(
            r#"<block type="component_method"><mutation component_type="Button" method_name="Animate" instance_name="Button1"></mutation><value name="ARG0">{}</value><value name="ARG1">{}</value><value name="ARG2">{}</value></block>"#,
            num("1"),
            text("two"),
            num("3")
        );
        let out = compile(&click(&call));
        assert!(out.source.contains("button1.animate(1, \"two\", 3);"));
    }

    #[test]
    fn test_declared_arity_pads_missing_arguments() {
        let table = MappingTable::from_json(
            r#"{"components": {
                "Form": {"targetTag": "LinearLayout", "idPrefix": "screen", "events": {"Initialize": {}}},
                "Ball": {"targetTag": "View", "idPrefix": "ball",
                         "methods": {"MoveTo": {"call": "{target}.moveTo({0}, {1})", "arity": 2}}}
            }}"#,
        )
        .unwrap();
        let layout = r#"{"Properties":{"$Name":"Screen1","$Type":"Form","$Components":[{"$Name":"Ball1","$Type":"Ball"}]}}"#;
        let call = format!(
            r#"<block type="component_method" id="m1"><mutation component_type="Ball" method_name="MoveTo" instance_name="Ball1"></mutation><value name="ARG0">{}</value></block>"#,
            num("10")
        );
        let out = compile_with(&table, layout, &on("Screen1", "Form", "Initialize", &call));
        assert!(out.source.contains("ball1.moveTo(10, null /* missing value */);"));
        assert_eq!(count_code(&out.diagnostics, DIAG_MISSING_VALUE), 1);

        // handlers without a listener run once from onCreate
        assert!(out.source.contains("        bindEvents();\n        screen1Initialize();\n"));
        assert!(out.source.contains("    private void screen1Initialize() {\n        ball1.moveTo("));
    }

    #[test]
    fn test_missing_value_placeholder() {
        let empty = r#"<block type="component_set_get" id="s9"><mutation component_type="Label" set_or_get="set" property_name="Text" instance_name="Label1"></mutation></block>"#;
        let out = compile(&click(empty));
        assert!(out.source.contains("label1.setText(null /* missing value */);"));
        assert_eq!(count_code(&out.diagnostics, DIAG_MISSING_VALUE), 1);
        assert_eq!(out.diagnostics[0].context.as_deref(), Some("s9"));
    }

    #[test]
    fn test_opaque_block_markers() {
        let color = r#"<block type="color_red" id="c1"><field name="COLOR">#ff0000</field></block>"#;
        let body = then(&set_text("Label1", color), r#"<block type="controls_openAnotherScreen" id="o1"></block>"#);
        let out = compile(&click(&body));
        assert!(out.source.contains("label1.setText(String.valueOf(null /* unsupported block: color_red */));"));
        assert!(out.source.contains("            // unsupported block: controls_openAnotherScreen\n"));
        assert_eq!(count_code(&out.diagnostics, DIAG_OPAQUE_BLOCK), 2);
    }

    #[test]
    fn test_misplaced_blocks() {
        let stray_value = num("4");
        let statement_as_value = set_text("Label1", &set_text("Label1", &text("x")));
        let out = compile(&click(&then(&stray_value, &statement_as_value)));
        assert!(out.source.contains("// misplaced value block: math_number"));
        assert!(out.source.contains("null /* misplaced statement: component_set_get */"));
        assert_eq!(count_code(&out.diagnostics, DIAG_MISPLACED_BLOCK), 2);
    }

    #[test]
    fn test_invalid_number_literal() {
        let out = compile(&click(&set_text("Label1", &num("12abc"))));
        assert!(out.source.contains("0 /* invalid number: 12abc */"));
        assert_eq!(count_code(&out.diagnostics, DIAG_INVALID_LITERAL), 1);
    }

    #[test]
    fn test_unresolved_component_keeps_handler_as_comment() {
        let body = set_text("Label9", &text("x"));
        let out = compile(&on("Button9", "Button", "Click", &body));
        assert!(out.source.contains("        // when Button9.Click (refers to an unknown component)\n"));
        assert!(out.source.contains("//    // unresolved: set Label9.Text to \"x\""));
        assert_eq!(count_code(&out.diagnostics, DIAG_UNRESOLVED_REFERENCE), 2);
        assert!(!out.source.contains("private Button"));
    }

    #[test]
    fn test_unmapped_event_is_commented() {
        let out = compile(&on("Button1", "Button", "GotFocus", &set_text("Label1", &text("f"))));
        assert!(out.source.contains("// when Button1.GotFocus (has no listener mapping)"));
        assert!(out.source.contains("//    label1.setText(\"f\");"));
        assert_eq!(count_code(&out.diagnostics, DIAG_UNMAPPED_EVENT), 1);
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_globals_become_fields() {
        let blocks = format!(
            r#"<xml><block type="global_declaration" id="g1"><field name="NAME">count</field><value name="VALUE">{}</value></block><block type="global_declaration" id="g2"><field name="NAME">count</field><value name="VALUE">{}</value></block>{}</xml>"#,
            num("0"),
            num("9"),
            click(&format!(
                r#"<block type="lexical_variable_set"><field name="VAR">global count</field><value name="VALUE"><block type="math_add"><mutation items="2"></mutation><value name="NUM0"><block type="lexical_variable_get"><field name="VAR">global count</field></block></value><value name="NUM1">{}</value></block></value></block>"#,
                num("1")
            ))
            .replace("<xml>", "")
            .replace("</xml>", "")
        );
        let out = compile(&blocks);
        assert!(out.source.contains("    private double count;\n"));
        assert!(out.source.contains("        count = 0;\n        bindEvents();\n"));
        assert!(out.source.contains("            count = (count + 1);\n"));
        assert_eq!(count_code(&out.diagnostics, DIAG_IGNORED_BLOCK), 1);
    }

    #[test]
    fn test_text_join_and_lists() {
        let join = format!(
            r#"<block type="text_join"><mutation items="2"></mutation><value name="ADD0">{}</value><value name="ADD1">{}</value></block>"#,
            text("n="),
            num("3")
        );
        let list = format!(
            r#"<block type="lists_create_with"><mutation items="2"></mutation><value name="ADD0">{}</value><value name="ADD1">{}</value></block>"#,
            num("1"),
            num("2")
        );
        let body = then(&set_text("Label1", &join), &local("xs", &list, ""));
        let out = compile(&click(&body));
        assert!(out.source.contains("label1.setText((String.valueOf(\"n=\") + String.valueOf(3)));"));
        assert!(out.source.contains(
            "java.util.List<Object> xs = new java.util.ArrayList<Object>(java.util.Arrays.asList(1, 2));"
        ));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let body = then(&local("x", &num("2"), &set_text("Label1", &get("x"))), &set_text("Label1", &get("nope")));
        let first = compile(&click(&body));
        for _ in 0..5 {
            let again = compile(&click(&body));
            assert_eq!(again.source, first.source);
            assert_eq!(again.diagnostics, first.diagnostics);
        }
    }

    #[test]
    fn test_escape_java() {
        assert_eq!(escape_java("say \"hi\"\n\\"), "say \\\"hi\\\"\\n\\\\");
        assert_eq!(escape_java("\u{1}"), "\\u0001");
    }
}
