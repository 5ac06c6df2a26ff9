//! Accessibility roles of the rendered tree and table.

/// The role of one projected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessibleRole {
    /// The outer tree container.
    Tree,

    /// One node of the tree.
    TreeItem,

    /// Container of an expanded item's children.
    Group,

    /// A data table.
    Table,

    /// A row within a table.
    Row,

    /// A column header.
    ColumnHeader,

    /// A cell within a table.
    Cell,

    /// A dialog box.
    Dialog,
}

impl AccessibleRole {
    /// The ARIA `role` attribute value.
    pub fn as_aria_role(self) -> &'static str {
        match self {
            AccessibleRole::Tree => "tree",
            AccessibleRole::TreeItem => "treeitem",
            AccessibleRole::Group => "group",
            AccessibleRole::Table => "table",
            AccessibleRole::Row => "row",
            AccessibleRole::ColumnHeader => "columnheader",
            AccessibleRole::Cell => "cell",
            AccessibleRole::Dialog => "dialog",
        }
    }

    /// Convert to AccessKit's Role enum.
    #[cfg(feature = "accessibility")]
    pub fn to_accesskit_role(self) -> accesskit::Role {
        use accesskit::Role;
        match self {
            AccessibleRole::Tree => Role::Tree,
            AccessibleRole::TreeItem => Role::TreeItem,
            AccessibleRole::Group => Role::Group,
            AccessibleRole::Table => Role::Table,
            AccessibleRole::Row => Role::Row,
            AccessibleRole::ColumnHeader => Role::ColumnHeader,
            AccessibleRole::Cell => Role::Cell,
            AccessibleRole::Dialog => Role::Dialog,
        }
    }
}

impl std::fmt::Display for AccessibleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_aria_role())
    }
}

#[cfg(feature = "accessibility")]
impl From<AccessibleRole> for accesskit::Role {
    fn from(role: AccessibleRole) -> Self {
        role.to_accesskit_role()
    }
}
