/// Entries of the widget's overflow menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ClearChat,
    Close,
}

impl MenuAction {
    pub fn all() -> Vec<MenuAction> {
        vec![MenuAction::ClearChat, MenuAction::Close]
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::ClearChat => "Clear Chat",
            MenuAction::Close => "Close",
        }
    }
}

/// Visibility state of the widget. Memory only.
#[derive(Debug, Clone, Default)]
pub struct WidgetShell {
    open: bool,
    menu_visible: bool,
}

impl WidgetShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_menu_visible(&self) -> bool {
        self.menu_visible
    }

    pub fn toggle_open(&mut self) {
        self.open = !self.open;
        if !self.open {
            self.menu_visible = false;
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn toggle_menu(&mut self) {
        self.menu_visible = !self.menu_visible;
    }

    pub fn hide_menu(&mut self) {
        self.menu_visible = false;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.menu_visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closing_hides_menu() {
        let mut shell = WidgetShell::new();
        shell.toggle_open();
        shell.toggle_menu();
        assert!(shell.is_open() && shell.is_menu_visible());

        shell.close();
        assert!(!shell.is_open());
        assert!(!shell.is_menu_visible());
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut shell = WidgetShell::new();
        shell.toggle_open();
        shell.toggle_open();
        assert!(!shell.is_open());
    }
}
