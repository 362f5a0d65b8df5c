//! Write parsed annotations back out in canonical form

use crate::checking::is_reserved;
use crate::formatting::*;
use crate::language::*;

/// Break a parsed string into styled fragments, with every tag spelled in the
/// requested form. Separators are written without surrounding whitespace.
pub fn format_with_renderer(parsed: &ParsedString, form: Form) -> Vec<(Syntax, String)> {
    let mut output = Formatter::new(form);
    output.format_nodes(parsed.children());
    output.fragments
}

/// Render a parsed string as plain text in the given form.
pub fn render_string(parsed: &ParsedString, form: Form) -> String {
    render(&Identity, format_with_renderer(parsed, form))
}

/// Render a sequence of nodes as plain text in the given form, as for the
/// contents of a group without its parentheses.
pub fn render_nodes(nodes: &[Node], form: Form) -> String {
    let mut output = Formatter::new(form);
    output.format_nodes(nodes);
    render(&Identity, output.fragments)
}

pub fn render_group(group: &Group, form: Form) -> String {
    let mut output = Formatter::new(form);
    output.format_group(group);
    render(&Identity, output.fragments)
}

struct Formatter {
    fragments: Vec<(Syntax, String)>,
    form: Form,
}

impl Formatter {
    fn new(form: Form) -> Formatter {
        Formatter {
            fragments: Vec::new(),
            form,
        }
    }

    fn append(&mut self, syntax: Syntax, content: &str) {
        self.fragments
            .push((syntax, content.to_string()));
    }

    fn format_nodes(&mut self, nodes: &[Node]) {
        for (i, node) in nodes
            .iter()
            .enumerate()
        {
            if i > 0 {
                self.append(Syntax::Structure, ",");
            }
            match node {
                Node::Tag(tag) => self.format_tag(tag),
                Node::Group(group) => self.format_group(group),
                Node::Splice(splice) => self.append(Syntax::Splice, &format!("{{{}}}", splice.name)),
            }
        }
    }

    fn format_group(&mut self, group: &Group) {
        self.append(Syntax::Structure, "(");
        self.format_nodes(group.children());
        self.append(Syntax::Structure, ")");
    }

    fn format_tag(&mut self, tag: &Tag) {
        let entry = tag.entry();
        let node = match self.form {
            Form::Long => &entry.long_name,
            Form::Short => &entry.short_name,
        };

        if is_reserved(&entry.name) {
            self.append(Syntax::Reserved, node);
        } else {
            self.append(Syntax::Tag, node);
        }

        match tag.remainder() {
            Remainder::None => {}
            Remainder::Value(value) => {
                self.append(Syntax::Structure, "/");
                if value.contains('#') {
                    self.append(Syntax::Placeholder, value);
                } else {
                    self.append(Syntax::Value, value);
                }
            }
            Remainder::Extension(extension) => {
                self.append(Syntax::Structure, "/");
                self.append(Syntax::Extension, extension);
            }
        }
    }
}

#[cfg(test)]
mod check {
    use super::*;
    use crate::parsing::{parse, ParseOptions};
    use crate::schema::fixture;

    #[test]
    fn short_and_long() {
        let schema = fixture::standard();
        let result = parse(
            "event/sensory-event, (Red ,  Circle/Oval)",
            schema,
            &ParseOptions::default(),
        );
        let parsed = result
            .parsed
            .unwrap();

        assert_eq!(
            render_string(&parsed, Form::Short),
            "Sensory-event,(Red,Circle/Oval)"
        );
        assert_eq!(
            render_string(&parsed, Form::Long),
            "Event/Sensory-event,(Property/Sensory-property/Color/Red,Item/Object/Geometric-object/2D-shape/Circle/Oval)"
        );
    }

    #[test]
    fn fragments_are_styled() {
        let schema = fixture::standard();
        let result = parse("Onset, Label/#", schema, &ParseOptions::permissive());
        let parsed = result
            .parsed
            .unwrap();

        let fragments = format_with_renderer(&parsed, Form::Short);
        assert_eq!(
            fragments,
            vec![
                (Syntax::Reserved, "Onset".to_string()),
                (Syntax::Structure, ",".to_string()),
                (Syntax::Tag, "Label".to_string()),
                (Syntax::Structure, "/".to_string()),
                (Syntax::Placeholder, "#".to_string()),
            ]
        );
    }

    #[test]
    fn groups_render_with_parentheses() {
        let schema = fixture::standard();
        let result = parse("(Red, (Blue, Green))", schema, &ParseOptions::default());
        let parsed = result
            .parsed
            .unwrap();

        let group = parsed
            .groups()
            .next()
            .unwrap();
        assert_eq!(render_group(group, Form::Short), "(Red,(Blue,Green))");
        assert_eq!(render_nodes(group.children(), Form::Short), "Red,(Blue,Green)");
    }
}
