//! IR interpreter
//!
//! Executes a lowered module directly, as the reference for what the IR
//! means. Tests compare interpreter results against expected program
//! semantics; no backend is involved. The six standard-library intrinsics
//! read from an in-memory input queue and append to an in-memory output
//! buffer instead of touching real stdio.
//!
//! The interpreter range-checks element accesses and reports them as
//! [`InterpError::OutOfBounds`]. That is a property of this harness, not of
//! the language, whose array accesses are unchecked.

use lk_intern::Interner;
use lk_ir::{
    Address, BinOp, BoolOp, CmpOp, ExternId, FuncRef, Function, GlobalId, Instr, Module, Operand,
    SlotId, Terminator,
};
use std::collections::VecDeque;
use thiserror::Error;

/// Interpreter error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpError {
    /// No defined function has the requested name
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    /// Entry arguments do not match the function's parameters
    #[error("wrong argument count: expected {expected}, got {found}")]
    WrongArgumentCount {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        found: usize,
    },
    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,
    /// Element access outside the storage it addresses
    #[error("index {index} out of bounds for {len} elements")]
    OutOfBounds {
        /// The out-of-range index
        index: i64,
        /// Element count of the storage
        len: usize,
    },
    /// `getint`/`getch`/`getarray` ran out of queued input
    #[error("input exhausted")]
    InputExhausted,
    /// Type mismatch
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Got type
        got: String,
    },
    /// Invalid operation
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Reached unreachable code
    #[error("reached unreachable code")]
    Unreachable,
}

/// Runtime value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Val {
    /// No value (`void`)
    Unit,
    /// `i64`
    Int(i64),
    /// Transient comparison result
    Bool(bool),
    /// Pointer into slot or global storage
    Ptr(MemRef),
}

impl Val {
    fn type_name(self) -> &'static str {
        match self {
            Self::Unit => "void",
            Self::Int(_) => "i64",
            Self::Bool(_) => "i1",
            Self::Ptr(_) => "ptr",
        }
    }
}

/// Where a pointer value points: the base of a global image or of a stack
/// slot in a live frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemRef {
    Global(GlobalId),
    Slot {
        /// Index into the frame stack; the frame outlives every callee the
        /// pointer is passed to
        frame: usize,
        slot: SlotId,
    },
}

/// One call frame: value registers plus stack slot storage
struct Frame {
    values: Vec<Val>,
    slots: Vec<Vec<i64>>,
}

/// Interpreter state for one module
pub struct Interpreter<'m> {
    module: &'m Module,
    interner: &'m Interner,
    /// Mutable global images, seeded from the initializers
    globals: Vec<Vec<i64>>,
    frames: Vec<Frame>,
    input: VecDeque<i64>,
    output: Vec<i64>,
}

impl<'m> Interpreter<'m> {
    /// Creates an interpreter over `module`, with globals reset to their
    /// initializer images and empty I/O channels.
    #[must_use]
    pub fn new(module: &'m Module, interner: &'m Interner) -> Self {
        Self {
            module,
            interner,
            globals: module.globals.iter().map(|g| g.values.clone()).collect(),
            frames: Vec::new(),
            input: VecDeque::new(),
            output: Vec::new(),
        }
    }

    /// Queues values for `getint`/`getch`/`getarray`.
    pub fn feed_input(&mut self, values: &[i64]) {
        self.input.extend(values);
    }

    /// Everything `putint`/`putch`/`putarray` wrote so far.
    #[must_use]
    pub fn output(&self) -> &[i64] {
        &self.output
    }

    /// Runs the named function with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns an [`InterpError`] for runtime faults; lowering guarantees
    /// well-formed calls inside the module, so faults come from the program
    /// semantics (division by zero, exhausted input) or from the harness's
    /// own range checks.
    pub fn run(&mut self, name: &str, args: &[Val]) -> Result<Val, InterpError> {
        let module = self.module;
        let func = module
            .functions
            .iter()
            .find(|func| self.interner.resolve(func.name) == name)
            .ok_or_else(|| InterpError::UnknownFunction(name.to_string()))?;
        if args.len() != func.params.len() {
            return Err(InterpError::WrongArgumentCount {
                expected: func.params.len(),
                found: args.len(),
            });
        }
        self.call(func, args.to_vec())
    }

    fn call(&mut self, func: &'m Function, args: Vec<Val>) -> Result<Val, InterpError> {
        let mut values = vec![Val::Unit; func.values.len()];
        values[..args.len()].copy_from_slice(&args);
        let slots = func.slots.iter().map(|slot| vec![0; slot.elems]).collect();
        self.frames.push(Frame { values, slots });
        let result = self.exec(func);
        self.frames.pop();
        result
    }

    fn exec(&mut self, func: &'m Function) -> Result<Val, InterpError> {
        let mut block = func.entry;
        loop {
            let bb = &func.blocks[block];
            for instr in &bb.instrs {
                self.exec_instr(instr)?;
            }
            match bb.terminator {
                Terminator::Br(dest) => block = dest,
                Terminator::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                } => {
                    let cond = self.as_bool(self.operand(cond)?)?;
                    block = if cond { then_dest } else { else_dest };
                }
                Terminator::Ret(Some(value)) => return self.operand(value),
                Terminator::Ret(None) => return Ok(Val::Unit),
                Terminator::Unreachable => return Err(InterpError::Unreachable),
            }
        }
    }

    fn exec_instr(&mut self, instr: &Instr) -> Result<(), InterpError> {
        match instr {
            Instr::Binary { dest, op, lhs, rhs } => {
                let lhs = self.as_int(self.operand(*lhs)?)?;
                let rhs = self.as_int(self.operand(*rhs)?)?;
                let value = match op {
                    BinOp::Add => lhs.wrapping_add(rhs),
                    BinOp::Sub => lhs.wrapping_sub(rhs),
                    BinOp::Mul => lhs.wrapping_mul(rhs),
                    BinOp::Div => {
                        if rhs == 0 {
                            return Err(InterpError::DivisionByZero);
                        }
                        lhs.wrapping_div(rhs)
                    }
                    BinOp::Rem => {
                        if rhs == 0 {
                            return Err(InterpError::DivisionByZero);
                        }
                        lhs.wrapping_rem(rhs)
                    }
                };
                self.set(*dest, Val::Int(value));
            }
            Instr::Neg { dest, operand } => {
                let value = self.as_int(self.operand(*operand)?)?;
                self.set(*dest, Val::Int(value.wrapping_neg()));
            }
            Instr::Cmp { dest, op, lhs, rhs } => {
                let lhs = self.as_int(self.operand(*lhs)?)?;
                let rhs = self.as_int(self.operand(*rhs)?)?;
                let flag = match op {
                    CmpOp::Eq => lhs == rhs,
                    CmpOp::Ne => lhs != rhs,
                    CmpOp::Lt => lhs < rhs,
                    CmpOp::Le => lhs <= rhs,
                    CmpOp::Gt => lhs > rhs,
                    CmpOp::Ge => lhs >= rhs,
                };
                self.set(*dest, Val::Bool(flag));
            }
            Instr::Bool { dest, op, lhs, rhs } => {
                let lhs = self.as_bool(self.operand(*lhs)?)?;
                let rhs = self.as_bool(self.operand(*rhs)?)?;
                let flag = match op {
                    BoolOp::And => lhs && rhs,
                    BoolOp::Or => lhs || rhs,
                };
                self.set(*dest, Val::Bool(flag));
            }
            Instr::Zext { dest, operand } => {
                let flag = self.as_bool(self.operand(*operand)?)?;
                self.set(*dest, Val::Int(i64::from(flag)));
            }
            Instr::ToBool { dest, operand } => {
                let value = self.as_int(self.operand(*operand)?)?;
                self.set(*dest, Val::Bool(value != 0));
            }
            Instr::Load { dest, addr } => {
                let (mem, index) = self.resolve(*addr)?;
                let value = self.read_mem(mem, index)?;
                self.set(*dest, Val::Int(value));
            }
            Instr::Store { addr, value } => {
                let value = self.as_int(self.operand(*value)?)?;
                let (mem, index) = self.resolve(*addr)?;
                self.write_mem(mem, index, value)?;
            }
            Instr::AddrOf { dest, addr } => {
                let mem = match addr {
                    Address::Slot { slot, index: None } => MemRef::Slot {
                        frame: self.frames.len() - 1,
                        slot: *slot,
                    },
                    Address::Global {
                        global,
                        index: None,
                    } => MemRef::Global(*global),
                    _ => {
                        return Err(InterpError::InvalidOperation(
                            "address-of an indexed element".to_string(),
                        ))
                    }
                };
                self.set(*dest, Val::Ptr(mem));
            }
            Instr::Call { dest, callee, args } => {
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.operand(*arg)?);
                }
                let module = self.module;
                let result = match callee {
                    FuncRef::Defined(id) => {
                        let func = &module.functions[id.0 as usize];
                        self.call(func, arg_vals)?
                    }
                    FuncRef::External(id) => self.call_extern(*id, &arg_vals)?,
                };
                if let Some(dest) = dest {
                    self.set(*dest, result);
                }
            }
        }
        Ok(())
    }

    /// The standard-library intrinsics, backed by the in-memory channels.
    fn call_extern(&mut self, id: ExternId, args: &[Val]) -> Result<Val, InterpError> {
        let interner = self.interner;
        let module = self.module;
        let name = interner.resolve(module.externs[id.0 as usize].name);
        match name {
            "getint" | "getch" => self
                .input
                .pop_front()
                .map(Val::Int)
                .ok_or(InterpError::InputExhausted),
            "putint" | "putch" => {
                let value = self.as_int(args[0])?;
                self.output.push(value);
                Ok(Val::Unit)
            }
            "putarray" => {
                let count = self.as_int(args[0])?;
                let mem = self.as_ptr(args[1])?;
                for index in 0..count {
                    let value = self.read_mem(mem, index)?;
                    self.output.push(value);
                }
                Ok(Val::Unit)
            }
            "getarray" => {
                let mem = self.as_ptr(args[0])?;
                let count = self.input.pop_front().ok_or(InterpError::InputExhausted)?;
                for index in 0..count {
                    let value = self.input.pop_front().ok_or(InterpError::InputExhausted)?;
                    self.write_mem(mem, index, value)?;
                }
                Ok(Val::Int(count))
            }
            other => Err(InterpError::InvalidOperation(format!(
                "extern `{other}` has no intrinsic implementation"
            ))),
        }
    }

    fn resolve(&self, addr: Address) -> Result<(MemRef, i64), InterpError> {
        let (mem, index) = match addr {
            Address::Slot { slot, index } => (
                MemRef::Slot {
                    frame: self.frames.len() - 1,
                    slot,
                },
                index,
            ),
            Address::Global { global, index } => (MemRef::Global(global), index),
            Address::Pointer { base, index } => {
                let mem = self.as_ptr(self.value(base)?)?;
                (mem, index)
            }
        };
        let index = match index {
            Some(operand) => self.as_int(self.operand(operand)?)?,
            None => 0,
        };
        Ok((mem, index))
    }

    fn read_mem(&self, mem: MemRef, index: i64) -> Result<i64, InterpError> {
        let storage = self.storage(mem);
        Self::check_index(index, storage.len())?;
        Ok(storage[index as usize])
    }

    fn write_mem(&mut self, mem: MemRef, index: i64, value: i64) -> Result<(), InterpError> {
        let storage = self.storage_mut(mem);
        Self::check_index(index, storage.len())?;
        storage[index as usize] = value;
        Ok(())
    }

    fn storage(&self, mem: MemRef) -> &[i64] {
        match mem {
            MemRef::Global(global) => &self.globals[global.0 as usize],
            MemRef::Slot { frame, slot } => &self.frames[frame].slots[slot.0 as usize],
        }
    }

    fn storage_mut(&mut self, mem: MemRef) -> &mut Vec<i64> {
        match mem {
            MemRef::Global(global) => &mut self.globals[global.0 as usize],
            MemRef::Slot { frame, slot } => &mut self.frames[frame].slots[slot.0 as usize],
        }
    }

    fn check_index(index: i64, len: usize) -> Result<(), InterpError> {
        if index < 0 || index as usize >= len {
            return Err(InterpError::OutOfBounds { index, len });
        }
        Ok(())
    }

    fn operand(&self, operand: Operand) -> Result<Val, InterpError> {
        match operand {
            Operand::Const(value) => Ok(Val::Int(value)),
            Operand::Value(value) => self.value(value),
        }
    }

    fn value(&self, value: lk_ir::ValueId) -> Result<Val, InterpError> {
        let frame = self
            .frames
            .last()
            .ok_or_else(|| InterpError::InvalidOperation("no active frame".to_string()))?;
        Ok(frame.values[value.0 as usize])
    }

    fn set(&mut self, dest: lk_ir::ValueId, value: Val) {
        if let Some(frame) = self.frames.last_mut() {
            frame.values[dest.0 as usize] = value;
        }
    }

    fn as_int(&self, value: Val) -> Result<i64, InterpError> {
        match value {
            Val::Int(value) => Ok(value),
            other => Err(InterpError::TypeMismatch {
                expected: "i64".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    fn as_bool(&self, value: Val) -> Result<bool, InterpError> {
        match value {
            Val::Bool(flag) => Ok(flag),
            other => Err(InterpError::TypeMismatch {
                expected: "i1".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    fn as_ptr(&self, value: Val) -> Result<MemRef, InterpError> {
        match value {
            Val::Ptr(mem) => Ok(mem),
            other => Err(InterpError::TypeMismatch {
                expected: "ptr".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lk_intern::Interner;
    use lk_ir::{Address, BinOp, FunctionBuilder, Module, Operand, Param, Terminator, Ty};

    fn arith_module(interner: &mut Interner) -> Module {
        let name = interner.intern("calc");
        let mut fb = FunctionBuilder::new(name, Vec::new(), Ty::I64);
        let product = fb.binary(BinOp::Mul, Operand::Const(6), Operand::Const(7));
        fb.terminate(Terminator::Ret(Some(product)));
        let mut module = Module::new();
        module.add_function(fb.finish());
        module
    }

    #[test]
    fn evaluates_arithmetic() {
        let mut interner = Interner::new();
        let module = arith_module(&mut interner);
        let mut interp = Interpreter::new(&module, &interner);
        assert_eq!(interp.run("calc", &[]), Ok(Val::Int(42)));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let mut interner = Interner::new();
        let name = interner.intern("crash");
        let mut fb = FunctionBuilder::new(name, Vec::new(), Ty::I64);
        let quotient = fb.binary(BinOp::Div, Operand::Const(1), Operand::Const(0));
        fb.terminate(Terminator::Ret(Some(quotient)));
        let mut module = Module::new();
        module.add_function(fb.finish());

        let mut interp = Interpreter::new(&module, &interner);
        assert_eq!(interp.run("crash", &[]), Err(InterpError::DivisionByZero));
    }

    #[test]
    fn slots_round_trip_through_stores_and_loads() {
        let mut interner = Interner::new();
        let name = interner.intern("stash");
        let slot_name = interner.intern("x");
        let mut fb = FunctionBuilder::new(
            name,
            vec![Param {
                name: slot_name,
                ty: Ty::I64,
            }],
            Ty::I64,
        );
        let slot = fb.new_slot(Some(slot_name), 1);
        fb.store(Address::slot(slot), Operand::Value(fb.param(0)));
        let loaded = fb.load(Address::slot(slot));
        let doubled = fb.binary(BinOp::Add, loaded, loaded);
        fb.terminate(Terminator::Ret(Some(doubled)));
        let mut module = Module::new();
        module.add_function(fb.finish());

        let mut interp = Interpreter::new(&module, &interner);
        assert_eq!(interp.run("stash", &[Val::Int(21)]), Ok(Val::Int(42)));
    }

    #[test]
    fn out_of_range_element_access_is_caught() {
        let mut interner = Interner::new();
        let name = interner.intern("oob");
        let mut fb = FunctionBuilder::new(name, Vec::new(), Ty::I64);
        let slot = fb.new_slot(None, 2);
        let loaded = fb.load(Address::Slot {
            slot,
            index: Some(Operand::Const(5)),
        });
        fb.terminate(Terminator::Ret(Some(loaded)));
        let mut module = Module::new();
        module.add_function(fb.finish());

        let mut interp = Interpreter::new(&module, &interner);
        assert_eq!(
            interp.run("oob", &[]),
            Err(InterpError::OutOfBounds { index: 5, len: 2 })
        );
    }
}
