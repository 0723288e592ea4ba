pub mod family_tabs;
