use crate::errors::{render, BadResponse, Mismatch};
use crate::structure::{Accessor, Hop, Key, Level, Step, Structure};
use json_pointer::JsonPointer;
use log::trace;
use serde_json::{Map, Value};
use std::borrow::Cow;

pub fn validate<'a>(structure: &'a Structure, instance: &'a Value) -> Result<(), BadResponse> {
    let mut vm = Vm {
        instance_tokens: vec![],
    };

    vm.eval_level(structure.level(), instance)
}

/// The outcome of looking up a key which did not fail outright.
enum Resolution<'a> {
    Present(&'a Value),
    Absent,
}

struct Vm<'a> {
    instance_tokens: Vec<Cow<'a, str>>,
}

impl<'a> Vm<'a> {
    fn eval_level(&mut self, level: &'a Level, instance: &'a Value) -> Result<(), BadResponse> {
        if level.is_empty() {
            return match instance.as_object() {
                Some(obj) if obj.is_empty() => Ok(()),
                _ => Err(self.mismatch(Mismatch::NotEmptyDict {
                    value: render(instance),
                })),
            };
        }

        for path in level.paths() {
            self.eval_hops(path.hops(), instance)?;
        }

        Ok(())
    }

    fn eval_hops(&mut self, hops: &'a [Hop], instance: &'a Value) -> Result<(), BadResponse> {
        let (hop, rest) = match hops.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };

        match hop {
            Hop::FanOut => {
                let obj = self.expect_object(instance)?;
                trace!("fanning out over {} keys at {:?}", obj.len(), self.pointer().to_string());
                for (property, sub_instance) in obj {
                    self.push_instance_token(property.as_str());
                    self.eval_hops(rest, sub_instance)?;
                    self.pop_instance_token();
                }
            }
            // Whatever follows a wildcard is not checked.
            Hop::Step(Step::Wildcard) => {
                self.expect_object(instance)?;
            }
            Hop::Step(Step::Group(level)) => {
                self.eval_level(level, instance)?;
            }
            Hop::Step(Step::Key(key)) => match self.resolve_key(key, instance)? {
                Resolution::Absent => {
                    trace!("optional key {:?} absent", key.name());
                }
                Resolution::Present(sub_instance) => {
                    self.eval_accessors(key.accessors(), rest, sub_instance)?;
                    if key.name().is_some() {
                        self.pop_instance_token();
                    }
                }
            },
        }

        Ok(())
    }

    fn resolve_key(&mut self, key: &'a Key, instance: &'a Value) -> Result<Resolution<'a>, BadResponse> {
        let name = match key.name() {
            Some(name) => name,
            None => return Ok(Resolution::Present(instance)),
        };

        let obj = self.expect_object(instance)?;
        match obj.get(name) {
            Some(sub_instance) => {
                self.push_instance_token(name);
                Ok(Resolution::Present(sub_instance))
            }
            None if key.is_optional() => Ok(Resolution::Absent),
            None => Err(self.mismatch(Mismatch::MissingKey {
                key: name.to_owned(),
                dict: render(instance),
            })),
        }
    }

    fn eval_accessors(
        &mut self,
        accessors: &'a [Accessor],
        rest: &'a [Hop],
        instance: &'a Value,
    ) -> Result<(), BadResponse> {
        let (accessor, remaining) = match accessors.split_first() {
            Some(split) => split,
            None => return self.eval_hops(rest, instance),
        };

        let arr = match instance.as_array() {
            Some(arr) => arr,
            None => {
                return Err(self.mismatch(Mismatch::NotAnArray {
                    value: render(instance),
                }))
            }
        };

        match *accessor {
            Accessor::Index(index) => {
                let elem = match arr.get(index) {
                    Some(elem) => elem,
                    None => {
                        return Err(self.mismatch(Mismatch::IndexOutOfBounds {
                            array: render(instance),
                            index,
                        }))
                    }
                };

                self.push_instance_token(Cow::Owned(index.to_string()));
                self.eval_accessors(remaining, rest, elem)?;
                self.pop_instance_token();
            }
            Accessor::NonEmpty if arr.is_empty() => {
                return Err(self.mismatch(Mismatch::EmptyArray));
            }
            Accessor::Each | Accessor::NonEmpty => {
                for (i, elem) in arr.iter().enumerate() {
                    self.push_instance_token(Cow::Owned(i.to_string()));
                    self.eval_accessors(remaining, rest, elem)?;
                    self.pop_instance_token();
                }
            }
        }

        Ok(())
    }

    fn expect_object(&self, instance: &'a Value) -> Result<&'a Map<String, Value>, BadResponse> {
        instance.as_object().ok_or_else(|| {
            self.mismatch(Mismatch::NotADict {
                value: render(instance),
            })
        })
    }

    fn push_instance_token<T: Into<Cow<'a, str>>>(&mut self, token: T) {
        self.instance_tokens.push(token.into());
    }

    fn pop_instance_token(&mut self) {
        self.instance_tokens.pop();
    }

    fn pointer(&self) -> JsonPointer<String, Vec<String>> {
        JsonPointer::new(
            self.instance_tokens
                .iter()
                .map(|token| token.clone().into_owned())
                .collect(),
        )
    }

    fn mismatch(&self, kind: Mismatch) -> BadResponse {
        BadResponse::new(kind, self.pointer())
    }
}
