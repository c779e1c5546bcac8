use std::collections::HashMap;

use crate::{
    foundation::error::{SplashError, SplashResult},
    script::{
        parser::{Statement, parse_script},
        value::{CommandToken, Environment},
    },
};

/// Handler invoked for a command statement.
///
/// `C` is the caller-owned context (bundle, surface, ...) handed to every handler for the
/// duration of one `eval` call.
pub type CommandFn<C> = fn(&mut C, &Environment, &[CommandToken]) -> SplashResult<()>;

pub struct Interpreter<C> {
    env: Environment,
    commands: HashMap<String, CommandFn<C>>,
}

impl<C> Default for Interpreter<C> {
    fn default() -> Self {
        Self {
            env: Environment::new(),
            commands: HashMap::new(),
        }
    }
}

impl<C> Interpreter<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, handler: CommandFn<C>) {
        self.commands.insert(name.into(), handler);
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Parse and run `source`. Stops at the first failing statement.
    pub fn eval(&mut self, source: &str, ctx: &mut C) -> SplashResult<()> {
        let program = parse_script(source)?;
        tracing::debug!(statements = program.len(), "script parsed");
        for stmt in &program {
            self.exec(stmt, ctx)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Statement, ctx: &mut C) -> SplashResult<()> {
        match stmt {
            Statement::Assign { line, name, value } => {
                let v = match value {
                    CommandToken::Literal(v) => v.clone(),
                    CommandToken::Variable(src) => self
                        .env
                        .get(src)
                        .cloned()
                        .ok_or_else(|| SplashError::Command {
                            line: *line,
                            command: format!("{name} ="),
                            source: Box::new(SplashError::VariableNotFound(src.clone())),
                        })?,
                };
                self.env.set(name.clone(), v);
                Ok(())
            }
            Statement::Invoke {
                line,
                command,
                args,
            } => {
                let handler = self.commands.get(command).ok_or_else(|| SplashError::Command {
                    line: *line,
                    command: command.clone(),
                    source: Box::new(SplashError::UnknownCommand(command.clone())),
                })?;
                tracing::trace!(line, command = %command, argc = args.len(), "invoke");
                handler(ctx, &self.env, args).map_err(|e| SplashError::Command {
                    line: *line,
                    command: command.clone(),
                    source: Box::new(e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::value::Value;

    #[derive(Default)]
    struct Log(Vec<String>);

    fn echo(ctx: &mut Log, env: &Environment, args: &[CommandToken]) -> SplashResult<()> {
        for a in args {
            let v = match a {
                CommandToken::Literal(v) => v.clone(),
                CommandToken::Variable(n) => env
                    .get(n)
                    .cloned()
                    .ok_or_else(|| SplashError::VariableNotFound(n.clone()))?,
            };
            ctx.0.push(format!("{v:?}"));
        }
        Ok(())
    }

    fn fail(_: &mut Log, _: &Environment, _: &[CommandToken]) -> SplashResult<()> {
        Err(SplashError::surface("nope"))
    }

    fn interp() -> Interpreter<Log> {
        let mut vm = Interpreter::new();
        vm.register("echo", echo);
        vm.register("fail", fail);
        vm
    }

    #[test]
    fn assignments_are_visible_to_later_commands() {
        let mut vm = interp();
        let mut log = Log::default();
        vm.eval("n = 3\ns = \"x\"\nm = n\necho n s m 7", &mut log)
            .unwrap();
        assert_eq!(log.0, ["Int(3)", "Str(\"x\")", "Int(3)", "Int(7)"]);
        assert_eq!(vm.env().get("m"), Some(&Value::Int(3)));
    }

    #[test]
    fn first_error_halts_evaluation() {
        let mut vm = interp();
        let mut log = Log::default();
        let err = vm.eval("echo 1\nfail\necho 2", &mut log).unwrap_err();
        assert_eq!(log.0, ["Int(1)"]);
        assert!(matches!(err, SplashError::Command { line: 2, .. }));
        assert!(matches!(err.root(), SplashError::Surface(_)));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut vm = interp();
        let err = vm.eval("blink 3", &mut Log::default()).unwrap_err();
        assert!(matches!(err.root(), SplashError::UnknownCommand(c) if c == "blink"));
    }

    #[test]
    fn syntax_error_prevents_any_execution() {
        let mut vm = interp();
        let mut log = Log::default();
        let err = vm.eval("echo 1\necho \"unterminated", &mut log).unwrap_err();
        assert!(matches!(err, SplashError::Syntax { line: 2, .. }));
        assert!(log.0.is_empty());
    }

    #[test]
    fn copying_an_undefined_variable_fails() {
        let mut vm = interp();
        let err = vm.eval("a = missing", &mut Log::default()).unwrap_err();
        assert!(matches!(err.root(), SplashError::VariableNotFound(n) if n == "missing"));
    }
}
