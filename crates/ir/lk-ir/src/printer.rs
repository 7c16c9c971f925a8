//! Stable textual rendering of a module, for snapshot tests and debugging

use crate::{
    Address, BasicBlock, BinOp, BoolOp, CmpOp, ExternFunction, FuncRef, Function, Global, Instr,
    Module, Operand, Terminator, Ty,
};
use lk_intern::Interner;
use std::fmt::Write as _;

/// Renders the whole module.
#[must_use]
pub fn print_module(module: &Module, interner: &Interner) -> String {
    let mut out = String::new();
    for global in &module.globals {
        write_global(&mut out, global, interner);
    }
    for decl in &module.externs {
        write_extern(&mut out, decl, interner);
    }
    for (index, func) in module.functions.iter().enumerate() {
        if index > 0 || !module.globals.is_empty() || !module.externs.is_empty() {
            out.push('\n');
        }
        write_function(&mut out, func, module, interner);
    }
    out
}

fn write_global(out: &mut String, global: &Global, interner: &Interner) {
    let kw = if global.mutable { "global" } else { "const" };
    let name = interner.resolve(global.name);
    let values: Vec<String> = global.values.iter().map(ToString::to_string).collect();
    let _ = writeln!(
        out,
        "{kw} @{name}: [i64; {}] = [{}]",
        global.values.len(),
        values.join(", ")
    );
}

fn write_extern(out: &mut String, decl: &ExternFunction, interner: &Interner) {
    let name = interner.resolve(decl.name);
    let params: Vec<&str> = decl.params.iter().map(|ty| ty_name(*ty)).collect();
    let _ = writeln!(
        out,
        "declare @{name}({}) -> {}",
        params.join(", "),
        ty_name(decl.ret)
    );
}

fn write_function(out: &mut String, func: &Function, module: &Module, interner: &Interner) {
    let name = interner.resolve(func.name);
    let params: Vec<String> = func
        .params
        .iter()
        .enumerate()
        .map(|(index, param)| format!("v{index}: {}", ty_name(param.ty)))
        .collect();
    let _ = writeln!(
        out,
        "fn @{name}({}) -> {} {{",
        params.join(", "),
        ty_name(func.ret)
    );
    for slot in &func.slots {
        let _ = write!(out, "  slot s{}: [i64; {}]", slot.id.0, slot.elems);
        if let Some(slot_name) = slot.name {
            let _ = write!(out, "  ; {}", interner.resolve(slot_name));
        }
        out.push('\n');
    }
    for block in &func.blocks {
        write_block(out, block, module, interner);
    }
    out.push_str("}\n");
}

fn write_block(out: &mut String, block: &BasicBlock, module: &Module, interner: &Interner) {
    let _ = writeln!(out, "bb{}:", block.id);
    for instr in &block.instrs {
        let _ = writeln!(out, "  {}", instr_str(instr, module, interner));
    }
    let _ = writeln!(out, "  {}", terminator_str(&block.terminator));
}

fn instr_str(instr: &Instr, module: &Module, interner: &Interner) -> String {
    match instr {
        Instr::Binary { dest, op, lhs, rhs } => {
            format!(
                "v{} = {} {}, {}",
                dest.0,
                bin_op_name(*op),
                operand_str(*lhs),
                operand_str(*rhs)
            )
        }
        Instr::Neg { dest, operand } => format!("v{} = neg {}", dest.0, operand_str(*operand)),
        Instr::Cmp { dest, op, lhs, rhs } => {
            format!(
                "v{} = cmp {} {}, {}",
                dest.0,
                cmp_op_name(*op),
                operand_str(*lhs),
                operand_str(*rhs)
            )
        }
        Instr::Bool { dest, op, lhs, rhs } => {
            let name = match op {
                BoolOp::And => "and",
                BoolOp::Or => "or",
            };
            format!(
                "v{} = {name} {}, {}",
                dest.0,
                operand_str(*lhs),
                operand_str(*rhs)
            )
        }
        Instr::Zext { dest, operand } => format!("v{} = zext {}", dest.0, operand_str(*operand)),
        Instr::ToBool { dest, operand } => {
            format!("v{} = tobool {}", dest.0, operand_str(*operand))
        }
        Instr::Load { dest, addr } => {
            format!("v{} = load {}", dest.0, addr_str(*addr, module, interner))
        }
        Instr::Store { addr, value } => format!(
            "store {}, {}",
            operand_str(*value),
            addr_str(*addr, module, interner)
        ),
        Instr::AddrOf { dest, addr } => {
            format!("v{} = addr {}", dest.0, addr_str(*addr, module, interner))
        }
        Instr::Call { dest, callee, args } => {
            let callee_name = match callee {
                FuncRef::Defined(id) => interner.resolve(module.functions[id.0 as usize].name),
                FuncRef::External(id) => interner.resolve(module.externs[id.0 as usize].name),
            };
            let rendered: Vec<String> = args.iter().map(|arg| operand_str(*arg)).collect();
            match dest {
                Some(dest) => format!("v{} = call @{callee_name}({})", dest.0, rendered.join(", ")),
                None => format!("call @{callee_name}({})", rendered.join(", ")),
            }
        }
    }
}

fn terminator_str(terminator: &Terminator) -> String {
    match terminator {
        Terminator::Br(dest) => format!("br bb{dest}"),
        Terminator::CondBr {
            cond,
            then_dest,
            else_dest,
        } => format!(
            "condbr {}, bb{then_dest}, bb{else_dest}",
            operand_str(*cond)
        ),
        Terminator::Ret(Some(value)) => format!("ret {}", operand_str(*value)),
        Terminator::Ret(None) => "ret".to_string(),
        Terminator::Unreachable => "unreachable".to_string(),
    }
}

fn addr_str(addr: Address, module: &Module, interner: &Interner) -> String {
    let (base, index) = match addr {
        Address::Slot { slot, index } => (format!("s{}", slot.0), index),
        Address::Global { global, index } => {
            let name = interner.resolve(module.globals[global.0 as usize].name);
            (format!("@{name}"), index)
        }
        Address::Pointer { base, index } => (format!("*v{}", base.0), index),
    };
    match index {
        Some(index) => format!("{base}[{}]", operand_str(index)),
        None => base,
    }
}

fn operand_str(operand: Operand) -> String {
    match operand {
        Operand::Value(value) => format!("v{}", value.0),
        Operand::Const(value) => value.to_string(),
    }
}

fn bin_op_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::Div => "div",
        BinOp::Rem => "rem",
    }
}

fn cmp_op_name(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "eq",
        CmpOp::Ne => "ne",
        CmpOp::Lt => "lt",
        CmpOp::Le => "le",
        CmpOp::Gt => "gt",
        CmpOp::Ge => "ge",
    }
}

fn ty_name(ty: Ty) -> &'static str {
    match ty {
        Ty::I64 => "i64",
        Ty::Bool => "i1",
        Ty::Ptr => "ptr",
        Ty::Void => "void",
    }
}
