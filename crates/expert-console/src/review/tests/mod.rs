mod common;

mod transition;
