//! Rendering of the typed algebra to SPARQL 1.1 text

use std::fmt::Write;
use std::sync::LazyLock;

use graft_core::{Iri, PropertyPath, Term, Triple};
use regex::Regex;

use crate::error::StoreError;
use crate::query::{
    Expression, Pattern, Projection, QuadTemplate, Select, TermPattern, Update, Var, Verb,
};

static IRI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[^\s<>"{}|^`\\]+$"#).expect("valid IRI pattern"));
static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid variable pattern"));

pub fn render_select(select: &Select) -> Result<String, StoreError> {
    let mut out = String::new();
    write_select(&mut out, select)?;
    Ok(out)
}

pub fn render_update(update: &Update) -> Result<String, StoreError> {
    let mut out = String::new();
    match update {
        Update::InsertData { graph, triples } => {
            out.push_str("INSERT DATA { GRAPH ");
            write_iri(&mut out, graph)?;
            out.push_str(" { ");
            for triple in triples {
                write_triple(&mut out, triple)?;
                out.push(' ');
            }
            out.push_str("} }");
        }
        Update::Modify {
            delete,
            insert,
            patterns,
        } => {
            if !delete.is_empty() {
                out.push_str("DELETE ");
                write_templates(&mut out, delete)?;
                out.push(' ');
            }
            if !insert.is_empty() {
                out.push_str("INSERT ");
                write_templates(&mut out, insert)?;
                out.push(' ');
            }
            out.push_str("WHERE ");
            write_group(&mut out, patterns)?;
        }
        Update::DropGraph { graph } => {
            out.push_str("DROP SILENT GRAPH ");
            write_iri(&mut out, graph)?;
        }
    }
    Ok(out)
}

fn write_select(out: &mut String, select: &Select) -> Result<(), StoreError> {
    out.push_str("SELECT ");
    if select.distinct {
        out.push_str("DISTINCT ");
    }
    match &select.projection {
        Projection::Vars(vars) if vars.is_empty() => out.push('*'),
        Projection::Vars(vars) => {
            for (index, var) in vars.iter().enumerate() {
                if index > 0 {
                    out.push(' ');
                }
                write_var(out, var)?;
            }
        }
        Projection::Count(alias) => {
            out.push_str("(COUNT(*) AS ");
            write_var(out, alias)?;
            out.push(')');
        }
    }
    out.push_str(" WHERE ");
    write_group(out, &select.patterns)?;
    if let Some(limit) = select.limit {
        let _ = write!(out, " LIMIT {}", limit);
    }
    Ok(())
}

fn write_group(out: &mut String, patterns: &[Pattern]) -> Result<(), StoreError> {
    out.push_str("{ ");
    for pattern in patterns {
        write_pattern(out, pattern)?;
        out.push(' ');
    }
    out.push('}');
    Ok(())
}

fn write_pattern(out: &mut String, pattern: &Pattern) -> Result<(), StoreError> {
    match pattern {
        Pattern::Triple {
            subject,
            verb,
            object,
        } => {
            write_term_pattern(out, subject)?;
            out.push(' ');
            match verb {
                Verb::Var(var) => write_var(out, var)?,
                Verb::Path(path) => write_path(out, path)?,
            }
            out.push(' ');
            write_term_pattern(out, object)?;
            out.push_str(" .");
        }
        Pattern::Graph { name, patterns } => {
            out.push_str("GRAPH ");
            write_term_pattern(out, name)?;
            out.push(' ');
            write_group(out, patterns)?;
        }
        Pattern::Values { var, terms } => {
            out.push_str("VALUES ");
            write_var(out, var)?;
            out.push_str(" { ");
            for term in terms {
                write_term(out, term)?;
                out.push(' ');
            }
            out.push('}');
        }
        Pattern::Filter(expression) => {
            out.push_str("FILTER (");
            write_expression(out, expression)?;
            out.push(')');
        }
        Pattern::Exists(patterns) => {
            out.push_str("FILTER EXISTS ");
            write_group(out, patterns)?;
        }
        Pattern::NotExists(patterns) => {
            out.push_str("FILTER NOT EXISTS ");
            write_group(out, patterns)?;
        }
        Pattern::Union(branches) => {
            for (index, branch) in branches.iter().enumerate() {
                if index > 0 {
                    out.push_str(" UNION ");
                }
                write_group(out, branch)?;
            }
        }
        Pattern::SubSelect(select) => {
            out.push_str("{ ");
            write_select(out, select)?;
            out.push_str(" }");
        }
    }
    Ok(())
}

fn write_expression(out: &mut String, expression: &Expression) -> Result<(), StoreError> {
    match expression {
        Expression::Equal(left, right) | Expression::NotEqual(left, right) => {
            write_term_pattern(out, left)?;
            out.push_str(if matches!(expression, Expression::Equal(..)) {
                " = "
            } else {
                " != "
            });
            write_term_pattern(out, right)?;
        }
        Expression::In(var, terms) | Expression::NotIn(var, terms) => {
            write_var(out, var)?;
            out.push_str(if matches!(expression, Expression::In(..)) {
                " IN ("
            } else {
                " NOT IN ("
            });
            for (index, term) in terms.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_term(out, term)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

fn write_templates(out: &mut String, templates: &[QuadTemplate]) -> Result<(), StoreError> {
    out.push_str("{ ");
    for template in templates {
        out.push_str("GRAPH ");
        write_iri(out, &template.graph)?;
        out.push_str(" { ");
        write_term_pattern(out, &template.subject)?;
        out.push(' ');
        write_term_pattern(out, &template.predicate)?;
        out.push(' ');
        write_term_pattern(out, &template.object)?;
        out.push_str(" . } ");
    }
    out.push('}');
    Ok(())
}

fn write_triple(out: &mut String, triple: &Triple) -> Result<(), StoreError> {
    write_term(out, &triple.subject)?;
    out.push(' ');
    write_iri(out, &triple.predicate)?;
    out.push(' ');
    write_term(out, &triple.object)?;
    out.push_str(" .");
    Ok(())
}

fn write_path(out: &mut String, path: &PropertyPath) -> Result<(), StoreError> {
    for predicate in path.predicates() {
        validate_iri(predicate)?;
    }
    let _ = write!(out, "{}", path);
    Ok(())
}

fn write_term_pattern(out: &mut String, pattern: &TermPattern) -> Result<(), StoreError> {
    match pattern {
        TermPattern::Var(var) => write_var(out, var),
        TermPattern::Term(term) => write_term(out, term),
    }
}

fn write_var(out: &mut String, var: &Var) -> Result<(), StoreError> {
    if !VAR_RE.is_match(var.name()) {
        return Err(StoreError::InvalidVariable(var.name().to_string()));
    }
    let _ = write!(out, "{}", var);
    Ok(())
}

fn write_term(out: &mut String, term: &Term) -> Result<(), StoreError> {
    match term {
        Term::Iri(iri) => write_iri(out, iri)?,
        Term::BlankNode(id) => {
            let _ = write!(out, "_:{}", id);
        }
        Term::Literal(literal) => {
            out.push('"');
            out.push_str(&escape_literal(&literal.value));
            out.push('"');
            if let Some(language) = &literal.language {
                let _ = write!(out, "@{}", language);
            } else if let Some(datatype) = &literal.datatype {
                out.push_str("^^");
                write_iri(out, datatype)?;
            }
        }
    }
    Ok(())
}

fn write_iri(out: &mut String, iri: &Iri) -> Result<(), StoreError> {
    validate_iri(iri)?;
    let _ = write!(out, "<{}>", iri);
    Ok(())
}

fn validate_iri(iri: &Iri) -> Result<(), StoreError> {
    if IRI_RE.is_match(iri.as_str()) {
        Ok(())
    } else {
        Err(StoreError::InvalidIri(iri.to_string()))
    }
}

/// Escape a literal's lexical form for use between double quotes.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}
