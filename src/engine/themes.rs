//! Theme registry: families of prefixed symbols swapped as a unit.
//!
//! A symbol belongs to theme `T` when its name starts with `T-`; the rest of
//! the name is its member suffix. Copying snapshots values into another
//! prefix. Selecting installs aliases, so later edits to the selected theme
//! show through the family names.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::engine::error::StyleError;
use crate::engine::symbols::SymbolTable;
use crate::engine::value::Binding;

/// The full symbol name of `member` in `theme`.
pub fn member_name(theme: &str, member: &str) -> String {
    format!("{theme}-{member}")
}

/// Lifecycle of a theme family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeState {
    /// Members declared with `new-theme`, nothing copied or selected yet.
    Declared,
    /// One or more themes have been copied into the family.
    Copied,
    /// The family's members alias the members of `active`.
    Selected { active: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeFamily {
    members: BTreeSet<String>,
    /// Themes copied into this family, in copy order.
    variants: Vec<String>,
    state: ThemeState,
}

impl ThemeFamily {
    fn new(state: ThemeState) -> Self {
        Self {
            members: BTreeSet::new(),
            variants: Vec::new(),
            state,
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn state(&self) -> &ThemeState {
        &self.state
    }

    /// The currently selected theme, if any.
    pub fn active(&self) -> Option<&str> {
        match &self.state {
            ThemeState::Selected { active } => Some(active),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeRegistry {
    families: HashMap<String, ThemeFamily>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(&self, name: &str) -> Option<&ThemeFamily> {
        self.families.get(name)
    }

    /// Declare (or extend) the member schema of theme `name`.
    pub fn new_theme<I, S>(&mut self, name: &str, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let family = self
            .families
            .entry(name.to_string())
            .or_insert_with(|| ThemeFamily::new(ThemeState::Declared));
        family.members.extend(members.into_iter().map(Into::into));
        debug!(theme = name, members = family.members.len(), "declared theme");
    }

    /// Snapshot every bound `source-*` symbol into `target-*`.
    ///
    /// Values are resolved before they are copied, so the copy never aliases
    /// the source. If `target` is currently selected, members it already has
    /// keep their aliases. Returns the number of symbols written.
    pub fn copy_theme(
        &mut self,
        table: &mut SymbolTable,
        target: &str,
        source: &str,
    ) -> Result<usize, StyleError> {
        let prefix = member_name(source, "");
        let names = table.names_with_prefix(&prefix);
        if names.is_empty() {
            return Err(StyleError::EmptySourceTheme(source.to_string()));
        }

        let mut snapshot = Vec::with_capacity(names.len());
        for name in &names {
            let member = &name[prefix.len()..];
            snapshot.push((member.to_string(), table.lookup(name)?.clone()));
        }

        let family = self
            .families
            .entry(target.to_string())
            .or_insert_with(|| ThemeFamily::new(ThemeState::Copied));
        let selected = matches!(family.state, ThemeState::Selected { .. });

        let mut written = 0;
        for (member, binding) in snapshot {
            if selected && family.members.contains(&member) {
                continue;
            }
            table.assign(member_name(target, &member), binding);
            family.members.insert(member);
            written += 1;
        }
        if !selected {
            family.state = ThemeState::Copied;
        }
        family.variants.push(source.to_string());

        debug!(theme = target, source, written, "copied theme");
        Ok(written)
    }

    /// Alias every member of `family` to the same member of `theme`.
    ///
    /// Members missing from `theme` are not checked here; they fail with
    /// [`StyleError::UnboundSymbol`] when looked up.
    pub fn select_theme(
        &mut self,
        table: &mut SymbolTable,
        family: &str,
        theme: &str,
    ) -> Result<(), StyleError> {
        let entry = self
            .families
            .get_mut(family)
            .ok_or_else(|| StyleError::UnknownFamily(family.to_string()))?;
        if family == theme {
            let name = member_name(family, "*");
            return Err(StyleError::CyclicAlias {
                path: vec![name.clone(), name.clone()],
                name,
            });
        }

        for member in &entry.members {
            table.assign(
                member_name(family, member),
                Binding::alias(member_name(theme, member)),
            );
        }
        entry.state = ThemeState::Selected {
            active: theme.to_string(),
        };

        debug!(family, theme, members = entry.members.len(), "selected theme");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dark_table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.assign("dark-bg-color", Binding::literal("#000000"));
        table.assign("dark-strong-color", Binding::literal("#ffffff"));
        table.assign("stone-granite-bg-color", Binding::literal("#202020"));
        table.assign("stone-granite-strong-color", Binding::literal("#f0ffb0"));
        table
    }

    #[test]
    fn copy_snapshots_values() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        let written = themes.copy_theme(&mut table, "granite", "dark").unwrap();
        assert_eq!(written, 2);
        assert_eq!(table.binding("granite-bg-color"), Some(&Binding::literal("#000000")));

        table.assign("dark-bg-color", Binding::literal("#111111"));
        assert_eq!(table.lookup("granite-bg-color").unwrap(), &Binding::literal("#000000"));
    }

    #[test]
    fn copy_resolves_aliases_in_source() {
        let mut table = dark_table();
        table.assign("night-bg-color", Binding::alias("dark-bg-color"));
        let mut themes = ThemeRegistry::new();
        themes.copy_theme(&mut table, "granite", "night").unwrap();
        assert_eq!(table.binding("granite-bg-color"), Some(&Binding::literal("#000000")));
    }

    #[test]
    fn copy_from_empty_theme_fails() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        assert_eq!(
            themes.copy_theme(&mut table, "granite", "drak").unwrap_err(),
            StyleError::EmptySourceTheme("drak".into())
        );
        assert!(themes.family("granite").is_none());
    }

    #[test]
    fn copy_requires_hyphen_boundary() {
        let mut table = SymbolTable::new();
        table.assign("darker-bg-color", Binding::literal("#000000"));
        let mut themes = ThemeRegistry::new();
        assert!(themes.copy_theme(&mut table, "granite", "dark").is_err());
    }

    #[test]
    fn select_installs_live_aliases() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        themes.copy_theme(&mut table, "granite", "dark").unwrap();
        themes.select_theme(&mut table, "granite", "stone-granite").unwrap();

        assert_eq!(
            table.binding("granite-bg-color"),
            Some(&Binding::alias("stone-granite-bg-color"))
        );
        table.assign("stone-granite-bg-color", Binding::literal("#303030"));
        assert_eq!(table.lookup("granite-bg-color").unwrap(), &Binding::literal("#303030"));
        assert_eq!(themes.family("granite").and_then(ThemeFamily::active), Some("stone-granite"));
    }

    #[test]
    fn select_unknown_family_fails() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        assert_eq!(
            themes.select_theme(&mut table, "granite", "dark").unwrap_err(),
            StyleError::UnknownFamily("granite".into())
        );
    }

    #[test]
    fn select_declared_family() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        themes.new_theme("granite", ["bg-color", "title-color"]);
        assert_eq!(themes.family("granite").map(ThemeFamily::state), Some(&ThemeState::Declared));
        themes.select_theme(&mut table, "granite", "dark").unwrap();
        assert_eq!(table.lookup("granite-bg-color").unwrap(), &Binding::literal("#000000"));
        // Partial coverage: `dark` has no title color, reported lazily.
        assert_eq!(
            table.lookup("granite-title-color").unwrap_err(),
            StyleError::UnboundSymbol("dark-title-color".into())
        );
    }

    #[test]
    fn selecting_again_switches_target() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        themes.copy_theme(&mut table, "granite", "stone-granite").unwrap();
        themes.select_theme(&mut table, "granite", "dark").unwrap();
        themes.select_theme(&mut table, "granite", "stone-granite").unwrap();
        assert_eq!(table.lookup("granite-bg-color").unwrap(), &Binding::literal("#202020"));
    }

    #[test]
    fn copy_after_select_keeps_active_aliases() {
        let mut table = dark_table();
        table.assign("dark-math-color", Binding::literal("#ffd4c0"));
        let mut themes = ThemeRegistry::new();
        themes.new_theme("granite", ["bg-color"]);
        themes.select_theme(&mut table, "granite", "stone-granite").unwrap();

        let written = themes.copy_theme(&mut table, "granite", "dark").unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            table.binding("granite-bg-color"),
            Some(&Binding::alias("stone-granite-bg-color"))
        );
        assert_eq!(table.binding("granite-math-color"), Some(&Binding::literal("#ffd4c0")));
        let family = themes.family("granite").unwrap();
        assert_eq!(family.active(), Some("stone-granite"));
        assert_eq!(family.variants(), &["dark".to_string()]);
    }

    #[test]
    fn select_onto_itself_fails() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        themes.copy_theme(&mut table, "granite", "dark").unwrap();
        assert!(matches!(
            themes.select_theme(&mut table, "granite", "granite"),
            Err(StyleError::CyclicAlias { .. })
        ));
    }

    #[test]
    fn selecting_families_into_each_other_cycles() {
        let mut table = dark_table();
        let mut themes = ThemeRegistry::new();
        themes.new_theme("granite", ["bg-color"]);
        themes.new_theme("dark", ["bg-color"]);
        themes.select_theme(&mut table, "granite", "dark").unwrap();
        themes.select_theme(&mut table, "dark", "granite").unwrap();
        assert_eq!(
            table.lookup("granite-bg-color").unwrap_err(),
            StyleError::CyclicAlias {
                name: "granite-bg-color".into(),
                path: vec![
                    "granite-bg-color".into(),
                    "dark-bg-color".into(),
                    "granite-bg-color".into(),
                ],
            }
        );
        assert!(table.lookup("dark-bg-color").unwrap_err().is_lookup_error());
    }
}
