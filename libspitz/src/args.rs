/*
 * Created on Tue Feb 13 2024
 *
 * This file is a part of pits
 * pits is a small distributed bag-of-tasks execution runtime: a Job Manager
 * streams tasks to a fleet of Task Managers over a binary wire protocol, and
 * a co-located Committer guarantees each task's result is committed exactly
 * once.
 *
 * Copyright (c) 2024, the pits authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the MIT License as published in the LICENSE file
 * at the root of this project.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 *
*/

//! Parses the `key=value` CLI surface shared by `jm` and `tm` (spec.md §6).
//!
//! The first non-`key=value` positional argument is the job module path;
//! everything after it is passed through to the module unchanged.

use std::collections::HashMap;

pub struct ArgMap {
    opts: HashMap<String, String>,
    /// The module path and any arguments meant for the module, in order.
    pub module_args: Vec<String>,
}

impl ArgMap {
    pub fn parse(argv: &[String]) -> Self {
        let mut opts = HashMap::new();
        let mut module_args = Vec::new();
        let mut seen_module = false;

        for arg in argv {
            if !seen_module {
                if let Some((k, v)) = arg.split_once('=') {
                    opts.insert(k.to_owned(), v.to_owned());
                    continue;
                }
                seen_module = true;
            }
            module_args.push(arg.clone());
        }

        Self { opts, module_args }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.opts.get(key).map(String::as_str)
    }

    pub fn i64(&self, key: &str, default: i64) -> i64 {
        self.opts
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn u64(&self, key: &str, default: u64) -> u64 {
        self.opts
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.opts.get(key).map(String::as_str) {
            Some("true") | Some("1") | Some("yes") => true,
            Some("false") | Some("0") | Some("no") => false,
            _ => default,
        }
    }

    pub fn module_path(&self) -> Option<&str> {
        self.module_args.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_options_from_module_args() {
        let argv: Vec<String> = ["killtms=false", "nw=4", "mymodule.so", "--flag"]
            .into_iter()
            .map(String::from)
            .collect();
        let args = ArgMap::parse(&argv);
        assert_eq!(args.bool("killtms", true), false);
        assert_eq!(args.i64("nw", 0), 4);
        assert_eq!(args.module_path(), Some("mymodule.so"));
        assert_eq!(args.module_args, vec!["mymodule.so", "--flag"]);
    }

    #[test]
    fn key_value_after_module_path_is_passed_through() {
        let argv: Vec<String> = ["mymodule.so", "key=value"]
            .into_iter()
            .map(String::from)
            .collect();
        let args = ArgMap::parse(&argv);
        assert_eq!(args.module_path(), Some("mymodule.so"));
        assert_eq!(args.module_args, vec!["mymodule.so", "key=value"]);
        assert_eq!(args.str("key"), None);
    }

    #[test]
    fn defaults_are_returned_when_absent() {
        let args = ArgMap::parse(&[]);
        assert_eq!(args.i64("ctimeout", 5), 5);
        assert_eq!(args.bool("killtms", true), true);
    }
}
