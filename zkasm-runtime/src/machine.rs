//! # Machine
//!
//! A set of linked functions where bus `i` names function `i`. Nested calls
//! go through a per-callee cache keyed by the input tuple.
//!
//! The cache does not coalesce requests: two threads missing on the same
//! input may both evaluate the callee and the later insert wins. Function
//! evaluation is deterministic, so both results are the same.
//!
//! Every nested call runs one level deeper than its caller. Calls nested
//! deeper than `max_depth` end the whole execution with
//! [`RuntimeError::CallDepth`].

use std::collections::HashMap;
use std::sync::RwLock;

use num_bigint::BigUint;
use rayon::prelude::*;
use zkasm_spec::{FieldConfig, Function};

use crate::error::{Result, RuntimeError};
use crate::interpreter::{Execution, Interpreter, InterpreterConfig};
use crate::io::IoBus;

/// Outputs of a call, `None` when the callee failed
type CallResult = Option<Vec<BigUint>>;

pub struct Machine {
    functions: Vec<Function>,
    config: InterpreterConfig,
    cache: Vec<RwLock<HashMap<Vec<BigUint>, CallResult>>>,
}

impl Machine {
    pub fn new(functions: Vec<Function>) -> Self {
        Self::with_config(functions, InterpreterConfig::default())
    }

    pub fn with_config(functions: Vec<Function>, config: InterpreterConfig) -> Self {
        let cache = functions.iter().map(|_| RwLock::new(HashMap::new())).collect();
        Self {
            functions,
            config,
            cache,
        }
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, id: usize) -> Option<&Function> {
        self.functions.get(id)
    }

    /// Validate every function against `field`
    pub fn validate(&self, field: &FieldConfig) -> Result<()> {
        for f in &self.functions {
            f.validate(field)?;
        }
        Ok(())
    }

    /// Split every function against `field`. The result starts with an
    /// empty cache.
    pub fn split(&self, field: &FieldConfig) -> Result<Machine> {
        let mut functions = Vec::with_capacity(self.functions.len());
        for f in &self.functions {
            functions.push(zkasm_split::split_function(f, field)?);
        }
        Ok(Machine::with_config(functions, self.config.clone()))
    }

    /// Number of cached input tuples for function `id`
    pub fn cached(&self, id: usize) -> usize {
        self.cache
            .get(id)
            .and_then(|c| c.read().ok().map(|c| c.len()))
            .unwrap_or(0)
    }

    /// Run function `id` on `inputs`. Nested calls are served by the cache;
    /// the top-level call is always executed.
    pub fn call(&self, id: usize, inputs: &[BigUint]) -> Result<Execution> {
        let f = self.function(id).ok_or(RuntimeError::UnknownBus { bus: id })?;
        Interpreter::with_config(f, self.config.clone()).run(inputs, &self.frame(0))
    }

    /// Run function `id` on every row in parallel, sharing the call cache
    pub fn execute_rows(&self, id: usize, rows: &[Vec<BigUint>]) -> Result<Vec<Execution>> {
        rows.par_iter().map(|row| self.call(id, row)).collect()
    }

    fn frame(&self, depth: usize) -> Frame<'_> {
        Frame { machine: self, depth }
    }

    /// Outputs of function `id` on `inputs` called at `depth`, from the
    /// cache when possible
    fn evaluate(&self, id: usize, inputs: &[BigUint], depth: usize) -> Result<CallResult> {
        let (Some(f), Some(cache)) = (self.functions.get(id), self.cache.get(id)) else {
            return Err(RuntimeError::UnknownBus { bus: id });
        };

        if let Ok(entries) = cache.read() {
            if let Some(hit) = entries.get(inputs) {
                return Ok(hit.clone());
            }
        }

        let limit = self.config.max_depth;
        if depth > limit {
            tracing::warn!("{}: call depth limit {} reached", f.name(), limit);
            return Err(RuntimeError::CallDepth { limit });
        }

        tracing::debug!("call cache miss: {} ({} inputs, depth {})", f.name(), inputs.len(), depth);
        let config = InterpreterConfig {
            trace: false,
            ..self.config.clone()
        };
        let exec = Interpreter::with_config(f, config).run(inputs, &self.frame(depth))?;
        let result = exec.is_returned().then_some(exec.outputs);

        if let Ok(mut entries) = cache.write() {
            entries.insert(inputs.to_vec(), result.clone());
        }
        Ok(result)
    }
}

/// The machine as seen by a call running at `depth`
struct Frame<'m> {
    machine: &'m Machine,
    depth: usize,
}

impl IoBus for Frame<'_> {
    fn read(&self, bus: usize, address: &[BigUint]) -> Result<Option<Vec<BigUint>>> {
        self.machine.evaluate(bus, address, self.depth + 1)
    }

    /// Functions only answer reads
    fn write(&self, bus: usize, _address: &[BigUint], _data: &[BigUint]) -> Result<()> {
        Err(RuntimeError::UnknownBus { bus })
    }
}

impl IoBus for Machine {
    fn read(&self, bus: usize, address: &[BigUint]) -> Result<Option<Vec<BigUint>>> {
        self.frame(0).read(bus, address)
    }

    fn write(&self, bus: usize, address: &[BigUint], data: &[BigUint]) -> Result<()> {
        self.frame(0).write(bus, address, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkasm_spec::{Bus, Code, Instruction, Polynomial, Register, RegisterId};

    fn r(i: usize) -> RegisterId {
        RegisterId::new(i)
    }

    fn v(x: u64) -> BigUint {
        BigUint::from(x)
    }

    /// Function 0: y = x * x
    fn square() -> Function {
        Function::new(
            "square",
            vec![Register::input("x", 8), Register::output("y", 16)],
            vec![],
            vec![Instruction::new(vec![
                Code::assign(vec![r(1)], Polynomial::new().term(1u32, vec![r(0), r(0)])),
                Code::Ret,
            ])],
        )
        .unwrap()
    }

    /// Function 1: y = square(x) + 1, failing on x == 0 through function 2
    fn caller() -> Function {
        Function::new(
            "caller",
            vec![
                Register::input("x", 8),
                Register::output("y", 17),
                Register::temporary("sq", 16),
                Register::temporary("ok", 8),
            ],
            vec![
                Bus::new("square", 0, vec![r(0)], vec![r(2)]),
                Bus::new("nonzero", 2, vec![r(0)], vec![r(3)]),
            ],
            vec![Instruction::new(vec![
                Code::call(2, vec![r(3)], vec![r(0)]),
                Code::call(0, vec![r(2)], vec![r(0)]),
                Code::add(vec![r(1)], vec![r(2)], 1u32),
                Code::Ret,
            ])],
        )
        .unwrap()
    }

    /// Function 2: fails on zero, otherwise echoes its input
    fn nonzero() -> Function {
        Function::new(
            "nonzero",
            vec![Register::input("x", 8), Register::output("y", 8)],
            vec![],
            vec![Instruction::new(vec![
                Code::skip_const(r(0), 0u32, 1),
                Code::Fail,
                Code::assign(vec![r(1)], Polynomial::var(r(0))),
                Code::Ret,
            ])],
        )
        .unwrap()
    }

    fn machine() -> Machine {
        Machine::new(vec![square(), caller(), nonzero()])
    }

    #[test]
    fn test_nested_call() {
        let m = machine();
        m.validate(&FieldConfig::UNBOUNDED).unwrap();
        let exec = m.call(1, &[v(12)]).unwrap();
        assert!(exec.is_returned());
        assert_eq!(exec.outputs, vec![v(145)]);
        assert_eq!(m.cached(0), 1);
        assert_eq!(m.cached(2), 1);
        // the top-level call is not cached
        assert_eq!(m.cached(1), 0);
    }

    #[test]
    fn test_callee_failure_fails_caller() {
        let m = machine();
        let exec = m.call(1, &[v(0)]).unwrap();
        assert!(exec.is_failed());
        assert_eq!(m.cached(2), 1);
        assert_eq!(m.cached(0), 0);
    }

    #[test]
    fn test_unknown_function() {
        let m = machine();
        assert!(matches!(m.call(7, &[]), Err(RuntimeError::UnknownBus { bus: 7 })));
        assert!(m.write(0, &[], &[]).is_err());
    }

    #[test]
    fn test_execute_rows_shares_cache() {
        let m = machine();
        let rows: Vec<Vec<BigUint>> = (0..64u64).map(|i| vec![v(1 + i % 8)]).collect();
        let execs = m.execute_rows(1, &rows).unwrap();
        assert_eq!(execs.len(), rows.len());
        for (row, exec) in rows.iter().zip(&execs) {
            assert_eq!(exec.outputs, vec![&row[0] * &row[0] + v(1)]);
        }
        assert_eq!(m.cached(0), 8);
    }

    /// Function 0: y = x == 0 ? 0 : countdown(x - 1)
    fn countdown() -> Function {
        Function::new(
            "countdown",
            vec![
                Register::input("x", 8),
                Register::output("y", 8),
                Register::temporary("t", 8),
                Register::temporary("b", 1),
            ],
            vec![Bus::new("countdown", 0, vec![r(2)], vec![r(1)])],
            vec![Instruction::new(vec![
                Code::skip_const(r(0), 0u32, 2),
                Code::add(vec![r(1)], vec![], 0u32),
                Code::Ret,
                Code::sub(vec![r(2), r(3)], vec![r(0)], 1u32),
                Code::call(0, vec![r(1)], vec![r(2)]),
                Code::Ret,
            ])],
        )
        .unwrap()
    }

    #[test]
    fn test_recursion_within_depth() {
        let config = InterpreterConfig {
            max_depth: 16,
            ..Default::default()
        };
        let m = Machine::with_config(vec![countdown()], config);
        m.validate(&FieldConfig::UNBOUNDED).unwrap();
        let exec = m.call(0, &[v(10)]).unwrap();
        assert_eq!(exec.outputs, vec![v(0)]);
        assert_eq!(m.cached(0), 10);
    }

    #[test]
    fn test_recursion_depth_limit() {
        let config = InterpreterConfig {
            max_depth: 16,
            ..Default::default()
        };
        let m = Machine::with_config(vec![countdown()], config);
        assert!(matches!(
            m.call(0, &[v(40)]),
            Err(RuntimeError::CallDepth { limit: 16 })
        ));
        // nothing below the failing frame completed
        assert_eq!(m.cached(0), 0);
    }

    #[test]
    fn test_split_machine() {
        let field = FieldConfig::new("test", 64, 8).unwrap();
        let split = machine().split(&field).unwrap();
        // x fits one limb, y'0 and y'1 come back
        let exec = split.call(0, &[v(200)]).unwrap();
        assert_eq!(exec.outputs, vec![v(40000 % 256), v(40000 / 256)]);

        let exec = split.call(1, &[v(3)]).unwrap();
        assert_eq!(exec.outputs, vec![v(10), v(0), v(0)]);
    }
}
