//! Emission of Rust items from a declaration table

use crate::types::TypeLowering;
use crate::{BindingOptions, GenerateError, ident};
use cb_decl::{CType, DeclKind, DeclTable, Linkage};
use cb_intern::Symbol;
use rustc_hash::FxHashSet;
use std::fmt::Write;
use tracing::debug;

const HEADER: &str = "/* automatically generated by cbind */";

/// Writes bindings for one declaration table
pub(crate) struct BindingWriter<'a> {
    table: &'a DeclTable,
    options: &'a BindingOptions,
    types: TypeLowering<'a>,
}

impl<'a> BindingWriter<'a> {
    pub(crate) fn new(table: &'a DeclTable, options: &'a BindingOptions) -> Self {
        Self {
            table,
            options,
            types: TypeLowering::new(table, options),
        }
    }

    pub(crate) fn write(mut self) -> Result<String, GenerateError> {
        let table = self.table;
        let selected = self.select();
        let mut aliases = String::new();
        let mut externs = String::new();

        for decl in table.iter().filter(|decl| selected.contains(&decl.name)) {
            let name = table.name(decl.name);
            match &decl.kind {
                DeclKind::TypeAlias { target, .. } => {
                    let target = self.types.lower_type(target, name)?;
                    writeln!(aliases, "pub type {} = {target};", ident::escape(name))?;
                }
                DeclKind::Function { linkage: Linkage::Internal, .. }
                | DeclKind::Global { linkage: Linkage::Internal, .. } => {
                    debug!(name, "skipping item with internal linkage");
                }
                DeclKind::Function { ty, param_names, .. } => {
                    let names = param_names
                        .iter()
                        .enumerate()
                        .map(|(index, param)| match param {
                            Some(param) => ident::escape(table.name(*param)),
                            None => format!("arg{}", index + 1),
                        })
                        .collect::<Vec<_>>();
                    let signature = self.types.signature(ty, &names, name)?;
                    writeln!(externs, "    pub fn {}{signature};", ident::escape(name))?;
                }
                DeclKind::Global { ty, is_const, .. } => {
                    let ty = self.types.lower_type(ty, name)?;
                    let binding = if *is_const { "static" } else { "static mut" };
                    writeln!(externs, "    pub {binding} {}: {ty};", ident::escape(name))?;
                }
            }
        }

        let mut out = String::new();
        writeln!(out, "{HEADER}")?;
        if self.types.uses_complex {
            writeln!(out)?;
            self.write_complex_shim(&mut out)?;
        }
        if !aliases.is_empty() {
            writeln!(out)?;
            out.push_str(&aliases);
        }
        if !externs.is_empty() {
            writeln!(out)?;
            if let Some(link) = &self.options.link_name {
                writeln!(out, "#[link(name = \"{link}\")]")?;
            }
            writeln!(out, "unsafe extern \"C\" {{")?;
            out.push_str(&externs);
            writeln!(out, "}}")?;
        }
        Ok(out)
    }

    fn write_complex_shim(&self, out: &mut String) -> Result<(), GenerateError> {
        writeln!(out, "#[repr(C)]")?;
        writeln!(out, "#[derive(Debug, Default, Copy, Clone, PartialEq)]")?;
        writeln!(out, "pub struct {}<T> {{", self.options.complex_type)?;
        writeln!(out, "    pub re: T,")?;
        writeln!(out, "    pub im: T,")?;
        writeln!(out, "}}")?;
        Ok(())
    }

    /// Names to emit: allowlisted items plus every typedef they reach
    fn select(&self) -> FxHashSet<Symbol> {
        if self.options.allowlist.is_empty() {
            return self.table.iter().map(|decl| decl.name).collect();
        }

        let mut selected = FxHashSet::default();
        let mut pending: Vec<CType> = Vec::new();
        for decl in self.table.iter() {
            let name = self.table.name(decl.name);
            if self.options.allowlist.iter().any(|pattern| matches_pattern(pattern, name)) {
                selected.insert(decl.name);
                pending.push(decl.kind.ty());
            } else {
                debug!(name, "not in allowlist");
            }
        }

        while let Some(ty) = pending.pop() {
            let mut names = Vec::new();
            collect_names(&ty, &mut names);
            for name in names {
                let Some(target) = self.table.alias_target(name) else {
                    continue;
                };
                if selected.insert(name) {
                    pending.push(target.clone());
                }
            }
        }
        selected
    }
}

/// Exact name, or a prefix followed by `*`
pub(crate) fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

fn collect_names(ty: &CType, names: &mut Vec<Symbol>) {
    match ty {
        CType::Named(name) => names.push(*name),
        CType::Pointer { pointee, .. } => collect_names(pointee, names),
        CType::Array { element, .. } => collect_names(element, names),
        CType::Function(func) => {
            collect_names(&func.ret, names);
            for param in &func.params {
                collect_names(param, names);
            }
        }
        _ => {}
    }
}
