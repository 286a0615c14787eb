use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{BinaryOperator, Block, Declaration, Expression, Program, Statement, UnaryOperator};

/// Storage layout for the emitted listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenOptions {
    /// First address handed out to a variable.
    pub base_address: u16,
    /// Temporary cell that holds the left operand of a binary operation.
    pub scratch_address: u16,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            base_address: 0x20,
            scratch_address: 0x7F,
        }
    }
}

/// Variable addresses in the order they were allocated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressTable {
    addresses: HashMap<String, u32>,
    order: Vec<String>,
}

impl AddressTable {
    pub fn get(&self, name: &str) -> Option<u32> {
        self.addresses.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.addresses[name]))
    }

    fn insert(&mut self, name: &str, address: u32) {
        self.addresses.insert(name.to_string(), address);
        self.order.push(name.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub lines: Vec<String>,
    pub variables: AddressTable,
}

impl Listing {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct Codegen {
    pub options: CodegenOptions,
    pub lines: Vec<String>,
    pub variables: AddressTable,
    // a u16 base plus the count of distinct names always fits
    pub next_address: u32,
    pub label_counter: usize,
}

impl Codegen {
    pub fn new(options: CodegenOptions) -> Self {
        Self {
            options,
            lines: vec![],
            variables: AddressTable::default(),
            next_address: u32::from(options.base_address),
            label_counter: 0,
        }
    }

    pub fn program(mut self, program: &Program) -> Listing {
        self.scope(&program.declarations, &program.statements);
        debug!(
            lines = self.lines.len(),
            variables = self.variables.len(),
            labels = self.label_counter,
            "generated listing"
        );
        Listing {
            lines: self.lines,
            variables: self.variables,
        }
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn make_label(&mut self, prefix: &str) -> String {
        let label = format!("{}{}", prefix, self.label_counter);
        self.label_counter += 1;
        trace!(%label, "allocated label");
        label
    }

    fn alloc_var(&mut self, name: &str) -> u32 {
        if let Some(address) = self.variables.get(name) {
            return address;
        }
        let address = self.next_address;
        self.variables.insert(name, address);
        self.next_address += 1;
        trace!(name, address = %hex(address), "allocated variable");
        address
    }

    fn scope(&mut self, declarations: &[Declaration], statements: &[Statement]) {
        for decl in declarations {
            self.alloc_var(&decl.name);
        }
        for stmt in statements {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, block: &Block) {
        self.scope(&block.declarations, &block.statements);
    }

    fn stmt(&mut self, node: &Statement) {
        match node {
            Statement::Assignment { name, index, value } => {
                self.expr(value);
                let address = self.alloc_var(name);
                if index.is_some() {
                    self.emit("; array indexing not implemented");
                }
                self.emit(format!("MOVWF {}", hex(address)));
            }
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                let else_label = self.make_label("else");
                let end_label = self.make_label("ifend");
                self.expr(condition);
                self.emit("CPFSEQ W");
                self.emit(format!("GOTO {}", else_label));
                self.block(then_block);
                self.emit(format!("GOTO {}", end_label));
                self.emit(format!("{}:", else_label));
                if let Some(else_block) = else_block {
                    self.block(else_block);
                }
                self.emit(format!("{}:", end_label));
            }
            Statement::While { condition, body } => {
                let top_label = self.make_label("while");
                let end_label = self.make_label("wend");
                self.emit(format!("{}:", top_label));
                self.expr(condition);
                self.emit("CPFSEQ W");
                self.emit(format!("GOTO {}", end_label));
                self.block(body);
                self.emit(format!("GOTO {}", top_label));
                self.emit(format!("{}:", end_label));
            }
            Statement::Block(block) => self.block(block),
        }
    }

    fn expr(&mut self, node: &Expression) {
        match node {
            Expression::Literal(value) => {
                self.emit(format!("MOVLW 0x{:02X}", value & 0xFF));
            }
            Expression::Identifier { name, .. } => {
                let address = self.alloc_var(name);
                self.emit(format!("MOVF {}, W", hex(address)));
            }
            Expression::Parenthesized(inner) => self.expr(inner),
            Expression::Unary { op, operand } => {
                self.expr(operand);
                match op {
                    UnaryOperator::Neg => self.emit("; unary minus not implemented"),
                    UnaryOperator::Not => self.emit("; logical not not implemented"),
                }
            }
            Expression::Binary { op, lhs, rhs } => {
                let scratch = hex(u32::from(self.options.scratch_address));
                self.expr(lhs);
                self.emit(format!("MOVWF {}", scratch));
                self.expr(rhs);
                match op {
                    BinaryOperator::Add => self.emit(format!("ADDWF {}, W", scratch)),
                    BinaryOperator::Sub => self.emit(format!("SUBWF {}, W", scratch)),
                    BinaryOperator::Mul => self.emit("; MULT not implemented"),
                    BinaryOperator::Div => self.emit("; DIV not implemented"),
                    BinaryOperator::Or
                    | BinaryOperator::And
                    | BinaryOperator::Eq
                    | BinaryOperator::Ne
                    | BinaryOperator::Lt
                    | BinaryOperator::Gt
                    | BinaryOperator::Lte
                    | BinaryOperator::Gte => self.emit(format!("; op {} not implemented", op)),
                }
            }
        }
    }
}

fn hex(address: u32) -> String {
    format!("0x{:02X}", address)
}

pub fn generate(program: &Program, options: &CodegenOptions) -> Listing {
    Codegen::new(*options).program(program)
}
