mod execution;
mod fsm;
mod program_parsing;
mod support;
