//! The `pm` capability object and `console` exposed to scripts.

use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rquickjs::{
    convert::Coerced,
    function::{Opt, Rest},
    object::Accessor,
    Ctx, Exception, FromJs, Function, Object, Value,
};
use tracing::debug;

use crate::{
    assert::{
        assert_client_error, assert_header, assert_json_path, assert_ok, assert_status,
        StatusExpectation,
    },
    error::{AssertionError, ScriptError},
    executor::ResponseData,
};

use super::{
    context::{get_variable, set_variable, ExecutionContext, VariableList},
    result::{TestOutcome, TestResult},
    ScriptPhase,
};

pub(super) struct Bindings {
    pub phase: ScriptPhase,
    pub context: ExecutionContext,
    pub recorder: Rc<RefCell<TestResult>>,
    pub interrupted: Arc<AtomicBool>,
}

pub(super) fn install<'js>(ctx: &Ctx<'js>, bindings: &Bindings) -> rquickjs::Result<()> {
    let pm = Object::new(ctx.clone())?;
    pm.set(
        "test",
        test_function(
            ctx,
            bindings.recorder.clone(),
            bindings.interrupted.clone(),
        )?,
    )?;

    pm.set(
        "collectionVariables",
        scope_object(ctx, bindings.context.collection_variables.clone())?,
    )?;
    let environment = scope_object(ctx, bindings.context.environment_variables.clone())?;
    pm.set("environment", environment.clone())?;
    pm.set("environmentVariables", environment)?;
    pm.set("variables", merged_scope_object(ctx, &bindings.context)?)?;

    if bindings.phase == ScriptPhase::Test {
        if let Some(response) = &bindings.context.response {
            pm.set("response", response_object(ctx, response.clone())?)?;
        }
    }

    let globals = ctx.globals();
    globals.set("pm", pm)?;
    globals.set("console", console_object(ctx, bindings.recorder.clone())?)?;
    Ok(())
}

fn test_function<'js>(
    ctx: &Ctx<'js>,
    recorder: Rc<RefCell<TestResult>>,
    interrupted: Arc<AtomicBool>,
) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>,
              name: Opt<Value<'js>>,
              callback: Opt<Value<'js>>|
              -> rquickjs::Result<()> {
            let name = name
                .0
                .and_then(|value| value.as_string().and_then(|text| text.to_string().ok()));
            let callback = callback.0.and_then(|value| value.into_function());

            let (name, callback) = match (name, callback) {
                (Some(name), Some(callback)) => (name, callback),
                (None, _) => {
                    recorder.borrow_mut().errors.push(ScriptError::InvalidTest(
                        "first argument must be a test name".to_string(),
                    ));
                    return Ok(());
                }
                (Some(name), None) => {
                    recorder.borrow_mut().errors.push(ScriptError::InvalidTest(format!(
                        "test '{name}' needs a callback function"
                    )));
                    return Ok(());
                }
            };

            let outcome = match callback.call::<_, Value<'js>>(()) {
                Ok(_) => TestOutcome::pass(name),
                // Leave the interrupt pending so it unwinds the whole script.
                Err(rquickjs::Error::Exception) if interrupted.load(Ordering::SeqCst) => {
                    return Err(rquickjs::Error::Exception);
                }
                Err(rquickjs::Error::Exception) => {
                    let thrown = ctx.catch();
                    TestOutcome::fail(name, describe_thrown(&ctx, thrown))
                }
                Err(err) => TestOutcome::fail(name, err.to_string()),
            };
            debug!(test = %outcome.name, passed = outcome.passed, "test finished");
            recorder.borrow_mut().outcomes.push(outcome);
            Ok(())
        },
    )
}

fn scope_object<'js>(ctx: &Ctx<'js>, list: VariableList) -> rquickjs::Result<Object<'js>> {
    let scope = Object::new(ctx.clone())?;

    let reader = list.clone();
    scope.set(
        "get",
        Function::new(ctx.clone(), move |key: Coerced<String>| {
            get_variable(&reader, &key.0)
        })?,
    )?;
    scope.set(
        "set",
        Function::new(
            ctx.clone(),
            move |key: Coerced<String>, value: Opt<Coerced<String>>| {
                set_variable(&list, &key.0, &assigned_text(value));
            },
        )?,
    )?;
    Ok(scope)
}

/// Text stored by `set`; a missing value stores `undefined`, as
/// `String(undefined)` would.
fn assigned_text(value: Opt<Coerced<String>>) -> String {
    value
        .0
        .map(|text| text.0)
        .unwrap_or_else(|| "undefined".to_string())
}

/// `pm.variables`: reads environment before collection, writes collection.
fn merged_scope_object<'js>(
    ctx: &Ctx<'js>,
    context: &ExecutionContext,
) -> rquickjs::Result<Object<'js>> {
    let scope = Object::new(ctx.clone())?;

    let reader = context.clone();
    scope.set(
        "get",
        Function::new(ctx.clone(), move |key: Coerced<String>| reader.lookup(&key.0))?,
    )?;
    let writer = context.collection_variables.clone();
    scope.set(
        "set",
        Function::new(
            ctx.clone(),
            move |key: Coerced<String>, value: Opt<Coerced<String>>| {
                set_variable(&writer, &key.0, &assigned_text(value));
            },
        )?,
    )?;
    Ok(scope)
}

fn response_object<'js>(
    ctx: &Ctx<'js>,
    response: Rc<ResponseData>,
) -> rquickjs::Result<Object<'js>> {
    let object = Object::new(ctx.clone())?;
    object.set("code", i32::from(response.status_code))?;
    object.set("status", response.status.clone())?;
    object.set("responseTime", response.duration_ms())?;

    let body = response.clone();
    object.set(
        "text",
        Function::new(ctx.clone(), move || body.body.clone())?,
    )?;

    let body = response.clone();
    object.set(
        "json",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>| -> rquickjs::Result<Value<'js>> {
            if let Err(err) = serde_json::from_str::<serde_json::Value>(&body.body) {
                let message = AssertionError::InvalidJson(err.to_string()).to_string();
                return Err(Exception::throw_message(&ctx, &message));
            }
            ctx.json_parse(body.body.clone())
        })?,
    )?;

    object.set("headers", headers_object(ctx, response.clone())?)?;
    object.set("to", assertion_object(ctx, response)?)?;
    Ok(object)
}

fn headers_object<'js>(
    ctx: &Ctx<'js>,
    response: Rc<ResponseData>,
) -> rquickjs::Result<Object<'js>> {
    let headers = Object::new(ctx.clone())?;

    let source = response.clone();
    headers.set(
        "get",
        Function::new(ctx.clone(), move |name: Coerced<String>| {
            source.header(&name.0).map(str::to_string)
        })?,
    )?;

    let source = response.clone();
    headers.set(
        "has",
        Function::new(ctx.clone(), move |name: Coerced<String>| {
            source.header(&name.0).is_some()
        })?,
    )?;

    headers.set(
        "toObject",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>| {
            let object = Object::new(ctx)?;
            for (name, value) in &response.headers {
                let key = name.to_ascii_lowercase();
                if !object.contains_key(key.as_str())? {
                    object.set(key, value.clone())?;
                }
            }
            Ok::<_, rquickjs::Error>(object)
        })?,
    )?;
    Ok(headers)
}

/// `pm.response.to.have.*` and `pm.response.to.be.*`.
fn assertion_object<'js>(
    ctx: &Ctx<'js>,
    response: Rc<ResponseData>,
) -> rquickjs::Result<Object<'js>> {
    let have = Object::new(ctx.clone())?;

    let subject = response.clone();
    have.set(
        "status",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, expected: Value<'js>| -> rquickjs::Result<()> {
                let expected = match expected.as_number() {
                    Some(code) => StatusExpectation::Code(code as u16),
                    None => {
                        StatusExpectation::Text(Coerced::<String>::from_js(&ctx, expected)?.0)
                    }
                };
                throw_on_failure(&ctx, assert_status(&subject, &expected))
            },
        )?,
    )?;

    let subject = response.clone();
    have.set(
        "header",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, name: Coerced<String>, expected: Opt<Value<'js>>| {
                let expected = match expected.0.filter(|value| !value.is_undefined()) {
                    Some(value) => Some(Coerced::<String>::from_js(&ctx, value)?.0),
                    None => None,
                };
                throw_on_failure(
                    &ctx,
                    assert_header(&subject, &name.0, expected.as_deref()),
                )
            },
        )?,
    )?;

    let subject = response.clone();
    have.set(
        "jsonBody",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, path: Coerced<String>, expected: Opt<Value<'js>>| {
                let expected = match expected.0 {
                    Some(value) => to_json(&ctx, value)?,
                    None => None,
                };
                throw_on_failure(
                    &ctx,
                    assert_json_path(&subject.body, &path.0, expected.as_ref()),
                )
            },
        )?,
    )?;

    let be = Object::new(ctx.clone())?;
    let subject = response.clone();
    be.prop(
        "ok",
        Accessor::new_get(move |ctx: Ctx<'js>| {
            throw_on_failure(&ctx, assert_ok(&subject)).map(|_| true)
        }),
    )?;
    let subject = response;
    be.prop(
        "error",
        Accessor::new_get(move |ctx: Ctx<'js>| {
            throw_on_failure(&ctx, assert_client_error(&subject)).map(|_| true)
        }),
    )?;

    let to = Object::new(ctx.clone())?;
    to.set("have", have)?;
    to.set("be", be)?;
    Ok(to)
}

fn console_object<'js>(
    ctx: &Ctx<'js>,
    recorder: Rc<RefCell<TestResult>>,
) -> rquickjs::Result<Object<'js>> {
    let console = Object::new(ctx.clone())?;
    for level in ["log", "info", "warn", "error"] {
        let recorder = recorder.clone();
        console.set(
            level,
            Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
                let line = args
                    .0
                    .into_iter()
                    .map(|value| display_value(&ctx, value))
                    .collect::<Vec<_>>()
                    .join(" ");
                debug!(console = level, "{line}");
                recorder.borrow_mut().logs.push(line);
            })?,
        )?;
    }
    Ok(console)
}

fn throw_on_failure(ctx: &Ctx<'_>, result: Result<(), AssertionError>) -> rquickjs::Result<()> {
    result.map_err(|err| Exception::throw_message(ctx, &err.to_string()))
}

/// Converts a script value to JSON; `undefined` and functions give `None`.
fn to_json<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Option<serde_json::Value>> {
    if value.is_undefined() {
        return Ok(None);
    }
    let Some(text) = ctx.json_stringify(value)? else {
        return Ok(None);
    };
    let text = text.to_string()?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|err| Exception::throw_message(ctx, &format!("unsupported expected value: {err}")))
}

fn display_value<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> String {
    if let Some(text) = value.as_string().and_then(|text| text.to_string().ok()) {
        return text;
    }
    if value.is_object() && !value.is_function() && value.as_exception().is_none() {
        if let Ok(Some(json)) = ctx.json_stringify(value.clone()) {
            if let Ok(text) = json.to_string() {
                return text;
            }
        }
    }
    Coerced::<String>::from_js(ctx, value)
        .map(|text| text.0)
        .unwrap_or_else(|_| "<unprintable>".to_string())
}

/// Message of a thrown value.
pub(super) fn describe_thrown<'js>(ctx: &Ctx<'js>, thrown: Value<'js>) -> String {
    match thrown.as_exception() {
        Some(exception) => describe_exception(exception),
        None => display_value(ctx, thrown),
    }
}

/// Exception message, prefixed with the error name unless it is a plain
/// `Error` (assertion failures are thrown as plain errors).
pub(super) fn describe_exception(exception: &Exception<'_>) -> String {
    let message = exception.message().unwrap_or_default();
    let name: Option<String> = exception.as_object().get("name").ok();
    match name.as_deref() {
        Some(name) if name != "Error" && !name.is_empty() => format!("{name}: {message}"),
        _ => message,
    }
}
