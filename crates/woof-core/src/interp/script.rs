//! Line-oriented reference interpreter.
//!
//! ```text
//! # comment
//! let n = 3
//! let xs = $data1
//! print n is $n, first cell is ${raw-data}
//! eprint warning
//! assert n == 3
//! write out.txt $n
//! read out.txt into text
//! connect 127.0.0.1:8080
//! sleep 250
//! fail something went wrong
//! ```
//!
//! `$name` substitutes a binding and `${id}` a data cell value by id.
//! Strings render without quotes, everything else as compact JSON.

use std::time::Duration;

use serde_json::Value;

use super::{ExecError, Interpreter, Namespace, Session, is_identifier};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The default interpreter shipped with the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptInterpreter;

impl ScriptInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl Interpreter for ScriptInterpreter {
    fn name(&self) -> &str {
        "script"
    }

    fn run(&self, body: &str, session: &mut Session<'_>) -> Result<(), ExecError> {
        for (lineno, raw) in body.lines().enumerate() {
            session.checkpoint()?;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            run_line(line, session).map_err(|e| match e {
                ExecError::Execution(msg) => {
                    ExecError::Execution(format!("line {}: {}", lineno + 1, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

fn run_line(line: &str, session: &mut Session<'_>) -> Result<(), ExecError> {
    let (directive, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match directive {
        "print" => {
            let text = substitute(rest, session.namespace)?;
            session.print(&text);
            session.print("\n");
        }
        "eprint" => {
            let text = substitute(rest, session.namespace)?;
            session.eprint(&text);
            session.eprint("\n");
        }
        "let" => {
            let (name, expr) = rest
                .split_once('=')
                .ok_or_else(|| ExecError::Execution("expected 'let <name> = <value>'".into()))?;
            let name = name.trim();
            if !is_identifier(name) {
                return Err(ExecError::Execution(format!("invalid name '{}'", name)));
            }
            let value = evaluate(expr.trim(), session.namespace)?;
            session.namespace.set(name, value);
        }
        "assert" => {
            let (name, expr) = rest.split_once("==").ok_or_else(|| {
                ExecError::Execution("expected 'assert <name> == <value>'".into())
            })?;
            let name = name.trim();
            let actual = lookup(name, session.namespace)?;
            let expected = evaluate(expr.trim(), session.namespace)?;
            if actual != expected {
                return Err(ExecError::Assertion(format!(
                    "{}: expected {}, found {}",
                    name, expected, actual
                )));
            }
        }
        "write" => {
            let (path, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let text = substitute(text.trim_start(), session.namespace)?;
            session.capabilities().files()?.write(path, &text)?;
        }
        "read" => {
            let (path, name) = rest.split_once(" into ").ok_or_else(|| {
                ExecError::Execution("expected 'read <path> into <name>'".into())
            })?;
            let name = name.trim();
            if !is_identifier(name) {
                return Err(ExecError::Execution(format!("invalid name '{}'", name)));
            }
            let text = session.capabilities().files()?.read_to_string(path.trim())?;
            session.namespace.set(name, Value::String(text));
        }
        "connect" => {
            session.capabilities().network()?.connect(rest, CONNECT_TIMEOUT)?;
        }
        "sleep" => {
            let millis: u64 = rest
                .parse()
                .map_err(|_| ExecError::Execution(format!("invalid duration '{}'", rest)))?;
            session.sleep(Duration::from_millis(millis))?;
        }
        "fail" => return Err(ExecError::Execution(rest.to_string())),
        other => {
            return Err(ExecError::Execution(format!("unknown directive '{}'", other)));
        }
    }
    Ok(())
}

/// A JSON literal or a `$name` reference.
fn evaluate(expr: &str, ns: &Namespace) -> Result<Value, ExecError> {
    if let Some(name) = expr.strip_prefix('$') {
        return lookup(name, ns);
    }
    serde_json::from_str(expr)
        .map_err(|e| ExecError::Execution(format!("invalid value '{}': {}", expr, e)))
}

fn lookup(name: &str, ns: &Namespace) -> Result<Value, ExecError> {
    ns.get(name)
        .cloned()
        .ok_or_else(|| ExecError::Execution(format!("name '{}' is not defined", name)))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Expand `$name` and `${id}` references.
fn substitute(text: &str, ns: &Namespace) -> Result<String, ExecError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| ExecError::Execution("unclosed '${'".into()))?;
            let id = &braced[..end];
            let value = ns
                .symbol(id)
                .or_else(|| ns.get(id))
                .ok_or_else(|| ExecError::Execution(format!("name '{}' is not defined", id)))?;
            out.push_str(&render(value));
            rest = &braced[end + 1..];
            continue;
        }

        let len = after
            .char_indices()
            .find(|&(i, c)| !(c.is_alphanumeric() || c == '_') || (i == 0 && c.is_numeric()))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        if len == 0 {
            out.push('$');
        } else {
            out.push_str(&render(&lookup(&after[..len], ns)?));
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    Ok(out)
}
