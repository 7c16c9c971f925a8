//! Typed, block-structured intermediate representation
//!
//! The IR is the product of lowering and the input to an external backend:
//! a module of functions, globals, and extern declarations. Every function is
//! a control-flow graph of basic blocks with exactly one terminator each,
//! over a small type system: `i64` for every language-level value, `ptr`
//! (pointer to `i64`) for decayed arrays, `void` for valueless calls, and a
//! transient `i1` produced by comparisons and consumed by conditional
//! branches and zero-extensions. Storage is explicit: named stack slots
//! (one or N contiguous `i64` elements) written and read through
//! [`Address`]es, matching a load/store backend one-to-one.

pub mod printer;

use lk_intern::Symbol;
use serde::{Deserialize, Serialize};

/// Value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ty {
    /// 64-bit signed integer
    I64,
    /// Comparison result (`i1`); canonicalized to `I64` before any
    /// language-level use
    Bool,
    /// Pointer to `i64` (a decayed array)
    Ptr,
    /// No value
    Void,
}

/// SSA value id; the first `param_count` values of a function are its
/// parameters
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Stack slot id, local to one function
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SlotId(pub u32);

/// Module global id
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct GlobalId(pub u32);

/// Defined function id
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// Extern declaration id
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExternId(pub u32);

/// Basic block id
pub type BlockId = usize;

/// A callable: either a function defined in this module or an extern
/// declaration
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum FuncRef {
    Defined(FuncId),
    External(ExternId),
}

/// Operand of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Result of an earlier instruction or a parameter
    Value(ValueId),
    /// `i64` immediate
    Const(i64),
}

/// Integer binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// Signed division; division by zero is left to the runtime
    Div,
    /// Signed remainder; remainder by zero is left to the runtime
    Rem,
}

/// Integer comparison operators; results are `Bool`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean connectives over `Bool` operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

/// A storage location an instruction loads from or stores to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    /// Element of a stack slot; `index: None` addresses a scalar slot
    Slot {
        slot: SlotId,
        index: Option<Operand>,
    },
    /// Element of a module global
    Global {
        global: GlobalId,
        index: Option<Operand>,
    },
    /// Element behind a pointer value (a decayed array parameter)
    Pointer {
        base: ValueId,
        index: Option<Operand>,
    },
}

impl Address {
    /// Scalar slot address.
    #[must_use]
    pub fn slot(slot: SlotId) -> Self {
        Self::Slot { slot, index: None }
    }

    /// Scalar global address.
    #[must_use]
    pub fn global(global: GlobalId) -> Self {
        Self::Global {
            global,
            index: None,
        }
    }
}

/// An instruction
///
/// Index operands of [`Address`]es are never range-checked; out-of-range
/// element access is undefined behavior deferred to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// `dest = lhs <op> rhs` over `i64`
    Binary {
        dest: ValueId,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// `dest = -operand`
    Neg { dest: ValueId, operand: Operand },
    /// `dest = lhs <op> rhs`, producing `Bool`
    Cmp {
        dest: ValueId,
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Boolean and/or over `Bool` operands
    Bool {
        dest: ValueId,
        op: BoolOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Zero-extend `Bool` to `i64` (`0`/`1` canonicalization)
    Zext { dest: ValueId, operand: Operand },
    /// `i64` to `Bool` via compare-not-equal-zero
    ToBool { dest: ValueId, operand: Operand },
    /// Load one `i64` element
    Load { dest: ValueId, addr: Address },
    /// Store one `i64` element
    Store { addr: Address, value: Operand },
    /// Address of an element, as a `Ptr` value (array-to-pointer decay)
    AddrOf { dest: ValueId, addr: Address },
    /// Call; `dest` is `None` when the callee returns `void`
    Call {
        dest: Option<ValueId>,
        callee: FuncRef,
        args: Vec<Operand>,
    },
}

/// Block terminator (control flow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminator {
    /// Unconditional branch
    Br(BlockId),
    /// Two-way branch on a `Bool` operand
    CondBr {
        cond: Operand,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    /// Return from the function
    Ret(Option<Operand>),
    /// Never reached; also the terminator of a non-void function's final
    /// block when control can fall off the end (verification is the
    /// backend's job)
    Unreachable,
}

/// Basic block in the control flow graph
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
}

/// One function-local stack allocation of `elems` contiguous `i64` elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSlot {
    pub id: SlotId,
    /// Source name, kept for printing and debugging
    pub name: Option<Symbol>,
    pub elems: usize,
}

/// Type of each value a function defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub ty: Ty,
}

/// A formal parameter; `I64` for scalars, `Ptr` for decayed arrays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Symbol,
    pub ty: Ty,
}

/// A function definition
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Symbol,
    pub params: Vec<Param>,
    /// `I64` or `Void`
    pub ret: Ty,
    pub blocks: Vec<BasicBlock>,
    pub slots: Vec<StackSlot>,
    pub values: Vec<ValueInfo>,
    pub entry: BlockId,
}

/// A declaration-only external function; the body comes from the runtime
/// support library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternFunction {
    pub name: Symbol,
    pub params: Vec<Ty>,
    pub ret: Ty,
}

/// A module global: `elems` flattened to an `i64` initializer image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: Symbol,
    pub values: Vec<i64>,
    /// `false` for `const` globals; a backend may place those read-only
    pub mutable: bool,
}

/// The whole compiled module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub functions: Vec<Function>,
    pub externs: Vec<ExternFunction>,
    pub globals: Vec<Global>,
}

impl Module {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: Function) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub fn add_extern(&mut self, decl: ExternFunction) -> ExternId {
        let id = ExternId(self.externs.len() as u32);
        self.externs.push(decl);
        id
    }

    pub fn add_global(&mut self, global: Global) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(global);
        id
    }

    /// Finds a defined function by name symbol.
    #[must_use]
    pub fn function(&self, name: Symbol) -> Option<&Function> {
        self.functions.iter().find(|func| func.name == name)
    }
}

/// Builder for constructing one function's control flow graph
///
/// The builder tracks an optional current block. Emitting a terminator
/// closes it; instructions emitted while no block is open are discarded, so
/// source statements that follow a `break`/`continue`/`return` can never
/// doubly terminate a block. They simply produce no IR.
pub struct FunctionBuilder {
    function: Function,
    current_block: Option<BlockId>,
}

impl FunctionBuilder {
    /// Creates a builder with an open entry block and one value per
    /// parameter.
    #[must_use]
    pub fn new(name: Symbol, params: Vec<Param>, ret: Ty) -> Self {
        let values = params.iter().map(|param| ValueInfo { ty: param.ty }).collect();
        let entry = BasicBlock {
            id: 0,
            instrs: Vec::new(),
            terminator: Terminator::Unreachable,
        };
        Self {
            function: Function {
                name,
                params,
                ret,
                blocks: vec![entry],
                slots: Vec::new(),
                values,
                entry: 0,
            },
            current_block: Some(0),
        }
    }

    /// Value carrying the `index`-th parameter.
    #[must_use]
    pub fn param(&self, index: usize) -> ValueId {
        ValueId(index as u32)
    }

    /// Creates a new block; it starts with an `Unreachable` terminator until
    /// [`FunctionBuilder::terminate`] replaces it.
    pub fn new_block(&mut self) -> BlockId {
        let id = self.function.blocks.len();
        self.function.blocks.push(BasicBlock {
            id,
            instrs: Vec::new(),
            terminator: Terminator::Unreachable,
        });
        id
    }

    /// Makes `block` the target of subsequent instructions.
    pub fn set_current_block(&mut self, block: BlockId) {
        self.current_block = Some(block);
    }

    /// Whether the current position already ended in a terminator.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.current_block.is_none()
    }

    /// Reserves `elems` contiguous stack elements.
    pub fn new_slot(&mut self, name: Option<Symbol>, elems: usize) -> SlotId {
        let id = SlotId(self.function.slots.len() as u32);
        self.function.slots.push(StackSlot { id, name, elems });
        id
    }

    fn new_value(&mut self, ty: Ty) -> ValueId {
        let id = ValueId(self.function.values.len() as u32);
        self.function.values.push(ValueInfo { ty });
        id
    }

    fn push(&mut self, instr: Instr) {
        if let Some(block) = self.current_block {
            self.function.blocks[block].instrs.push(instr);
        }
    }

    pub fn binary(&mut self, op: BinOp, lhs: Operand, rhs: Operand) -> Operand {
        let dest = self.new_value(Ty::I64);
        self.push(Instr::Binary { dest, op, lhs, rhs });
        Operand::Value(dest)
    }

    pub fn neg(&mut self, operand: Operand) -> Operand {
        let dest = self.new_value(Ty::I64);
        self.push(Instr::Neg { dest, operand });
        Operand::Value(dest)
    }

    pub fn cmp(&mut self, op: CmpOp, lhs: Operand, rhs: Operand) -> Operand {
        let dest = self.new_value(Ty::Bool);
        self.push(Instr::Cmp { dest, op, lhs, rhs });
        Operand::Value(dest)
    }

    pub fn bool_op(&mut self, op: BoolOp, lhs: Operand, rhs: Operand) -> Operand {
        let dest = self.new_value(Ty::Bool);
        self.push(Instr::Bool { dest, op, lhs, rhs });
        Operand::Value(dest)
    }

    /// Canonicalizes a `Bool` into an `i64` `0`/`1`.
    pub fn zext(&mut self, operand: Operand) -> Operand {
        let dest = self.new_value(Ty::I64);
        self.push(Instr::Zext { dest, operand });
        Operand::Value(dest)
    }

    /// Converts an `i64` into a `Bool` by comparing against zero.
    pub fn to_bool(&mut self, operand: Operand) -> Operand {
        let dest = self.new_value(Ty::Bool);
        self.push(Instr::ToBool { dest, operand });
        Operand::Value(dest)
    }

    pub fn load(&mut self, addr: Address) -> Operand {
        let dest = self.new_value(Ty::I64);
        self.push(Instr::Load { dest, addr });
        Operand::Value(dest)
    }

    pub fn store(&mut self, addr: Address, value: Operand) {
        self.push(Instr::Store { addr, value });
    }

    pub fn addr_of(&mut self, addr: Address) -> Operand {
        let dest = self.new_value(Ty::Ptr);
        self.push(Instr::AddrOf { dest, addr });
        Operand::Value(dest)
    }

    /// Emits a call; returns `None` for a `void` callee.
    pub fn call(&mut self, callee: FuncRef, args: Vec<Operand>, ret: Ty) -> Option<Operand> {
        let dest = (ret != Ty::Void).then(|| self.new_value(ret));
        self.push(Instr::Call { dest, callee, args });
        dest.map(Operand::Value)
    }

    /// Terminates the current block and closes it; a no-op when no block is
    /// open.
    pub fn terminate(&mut self, terminator: Terminator) {
        if let Some(block) = self.current_block.take() {
            self.function.blocks[block].terminator = terminator;
        }
    }

    /// Finishes building and returns the function.
    #[must_use]
    pub fn finish(self) -> Function {
        self.function
    }
}
