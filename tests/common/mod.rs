//! A scripted driver: each test primes the exact sequence of driver-level
//! calls it expects, with the SQL text, parameter vectors, and canned
//! results. Any deviation panics the test.
#![allow(dead_code)]

use futures::stream;
use quarry::{
    BoxFuture, Dialect, Driver, Error, Prepared, Result, RowLabeled, RowStream, RowsAffected,
    Transaction, Value,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum Step {
    Query {
        sql: String,
        params: Vec<Value>,
        labels: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Execute {
        sql: String,
        params: Vec<Value>,
        affected: u64,
        fail: Option<String>,
    },
    Begin,
    Prepare {
        sql: String,
    },
    Exec {
        params: Vec<Value>,
        fail: Option<String>,
    },
    Commit,
    Rollback,
}

pub fn query(sql: &str, params: Vec<Value>, labels: &[&str], rows: Vec<Vec<Value>>) -> Step {
    Step::Query {
        sql: sql.into(),
        params,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        rows,
    }
}

pub fn execute(sql: &str, params: Vec<Value>, affected: u64) -> Step {
    Step::Execute {
        sql: sql.into(),
        params,
        affected,
        fail: None,
    }
}

pub fn execute_fail(sql: &str, params: Vec<Value>, message: &str) -> Step {
    Step::Execute {
        sql: sql.into(),
        params,
        affected: 0,
        fail: Some(message.into()),
    }
}

pub fn prepare(sql: &str) -> Step {
    Step::Prepare { sql: sql.into() }
}

pub fn exec(params: Vec<Value>) -> Step {
    Step::Exec {
        params,
        fail: None,
    }
}

pub fn exec_fail(params: Vec<Value>, message: &str) -> Step {
    Step::Exec {
        params,
        fail: Some(message.into()),
    }
}

type Steps = Arc<Mutex<VecDeque<Step>>>;

pub struct ScriptedDriver {
    dialect: Dialect,
    steps: Steps,
}

impl ScriptedDriver {
    pub fn new(dialect: Dialect, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(ScriptedDriver {
            dialect,
            steps: Arc::new(Mutex::new(steps.into())),
        })
    }

    pub fn assert_done(&self) {
        let steps = self.steps.lock().unwrap();
        assert!(steps.is_empty(), "unconsumed driver steps: {:?}", steps);
    }
}

fn pop(steps: &Steps) -> Step {
    steps
        .lock()
        .unwrap()
        .pop_front()
        .expect("driver called beyond the scripted steps")
}

impl Driver for ScriptedDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> RowStream<'a> {
        match pop(&self.steps) {
            Step::Query {
                sql: want_sql,
                params: want_params,
                labels,
                rows,
            } => {
                assert_eq!(sql, want_sql, "query sql");
                assert_eq!(params, &want_params[..], "query params");
                let labels: Arc<[String]> = labels.into();
                let items: Vec<Result<RowLabeled>> = rows
                    .into_iter()
                    .map(|values| {
                        Ok(RowLabeled::new(labels.clone(), values.into_boxed_slice()))
                    })
                    .collect();
                Box::pin(stream::iter(items))
            }
            other => panic!("expected {:?}, got query `{}`", other, sql),
        }
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<RowsAffected>> {
        Box::pin(async move {
            match pop(&self.steps) {
                Step::Execute {
                    sql: want_sql,
                    params: want_params,
                    affected,
                    fail,
                } => {
                    assert_eq!(sql, want_sql, "execute sql");
                    assert_eq!(params, &want_params[..], "execute params");
                    match fail {
                        Some(message) => Err(Error::driver("scripted", sql, message)),
                        None => Ok(RowsAffected {
                            rows_affected: affected,
                            last_insert_id: None,
                        }),
                    }
                }
                other => panic!("expected {:?}, got execute `{}`", other, sql),
            }
        })
    }

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>>> {
        Box::pin(async move {
            match pop(&self.steps) {
                Step::Begin => Ok(Box::new(ScriptedTx {
                    steps: self.steps.clone(),
                }) as Box<dyn Transaction>),
                other => panic!("expected {:?}, got begin", other),
            }
        })
    }
}

struct ScriptedTx {
    steps: Steps,
}

impl Transaction for ScriptedTx {
    fn prepare<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<Box<dyn Prepared>>> {
        Box::pin(async move {
            match pop(&self.steps) {
                Step::Prepare { sql: want_sql } => {
                    assert_eq!(sql, want_sql, "prepare sql");
                    Ok(Box::new(ScriptedPrepared {
                        steps: self.steps.clone(),
                    }) as Box<dyn Prepared>)
                }
                other => panic!("expected {:?}, got prepare `{}`", other, sql),
            }
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            match pop(&self.steps) {
                Step::Commit => Ok(()),
                other => panic!("expected {:?}, got commit", other),
            }
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            match pop(&self.steps) {
                Step::Rollback => Ok(()),
                other => panic!("expected {:?}, got rollback", other),
            }
        })
    }
}

struct ScriptedPrepared {
    steps: Steps,
}

impl Prepared for ScriptedPrepared {
    fn execute<'a>(&'a mut self, params: &'a [Value]) -> BoxFuture<'a, Result<RowsAffected>> {
        Box::pin(async move {
            match pop(&self.steps) {
                Step::Exec {
                    params: want_params,
                    fail,
                } => {
                    assert_eq!(params, &want_params[..], "prepared exec params");
                    match fail {
                        Some(message) => Err(Error::driver("scripted", "", message)),
                        None => Ok(RowsAffected {
                            rows_affected: 1,
                            last_insert_id: None,
                        }),
                    }
                }
                other => panic!("expected {:?}, got prepared exec", other),
            }
        })
    }
}
