use std::collections::HashMap;

use single_step_batch::{
    config::SingleStepJobProperties,
    core::{job::Job, single_step::SingleStepJobBuilder},
    item::support::{FailingItemReader, ListItemReader, ListItemWriter},
    task::{MapTaskRepository, TaskJobLauncher, TaskRepository},
};

type Record = HashMap<String, String>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn properties() -> SingleStepJobProperties {
    SingleStepJobProperties {
        job_name: Some("job".to_string()),
        step_name: Some("step1".to_string()),
        chunk_size: Some(4),
    }
}

fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            HashMap::from([
                ("foo".to_string(), (i * 3).to_string()),
                ("bar".to_string(), (i * 3 + 1).to_string()),
                ("baz".to_string(), (i * 3 + 2).to_string()),
            ])
        })
        .collect()
}

fn validation_message(properties: &SingleStepJobProperties) -> String {
    match SingleStepJobBuilder::<Record, Record>::new(properties) {
        Err(error) => error.to_string(),
        Ok(_) => panic!("expected a configuration error"),
    }
}

#[test]
fn job_requires_a_job_name() {
    let properties = SingleStepJobProperties {
        job_name: None,
        ..properties()
    };
    assert_eq!(validation_message(&properties), "A job name is required");
}

#[test]
fn job_requires_a_step_name() {
    let properties = SingleStepJobProperties {
        step_name: None,
        ..properties()
    };
    assert_eq!(validation_message(&properties), "A step name is required");
}

#[test]
fn job_requires_a_chunk_size() {
    let properties = SingleStepJobProperties {
        chunk_size: None,
        ..properties()
    };
    assert_eq!(validation_message(&properties), "A chunk size is required");
}

#[test]
fn job_requires_a_positive_chunk_size() {
    let properties = SingleStepJobProperties {
        chunk_size: Some(0),
        ..properties()
    };
    assert_eq!(
        validation_message(&properties),
        "A chunk size greater than zero is required"
    );
}

#[test]
fn job_copies_every_item_from_reader_to_writer() {
    init_logger();

    let input = records(3);
    let reader = ListItemReader::new(input.clone());
    let writer = ListItemWriter::new();

    let job = SingleStepJobBuilder::new(&properties())
        .unwrap()
        .reader(&reader)
        .writer(&writer)
        .build()
        .unwrap();

    job.run().expect("job should succeed");

    assert_eq!(writer.written_items(), input);

    let step = job
        .step_execution("step1")
        .expect("step execution should be recorded");
    assert_eq!(step.read_count, 3);
    assert_eq!(step.write_count, 3);
}

#[test]
fn launched_job_is_tracked_from_running_to_completed() {
    init_logger();

    let reader = ListItemReader::new(records(5));
    let writer = ListItemWriter::new();

    let job = SingleStepJobBuilder::new(&properties())
        .unwrap()
        .reader(&reader)
        .writer(&writer)
        .build()
        .unwrap();

    let repository = MapTaskRepository::new();
    let launcher = TaskJobLauncher::new(&repository);

    let execution = launcher
        .launch(&job, &["--source=orders".to_string()])
        .expect("launch should succeed");

    assert!(!execution.is_running());
    assert_eq!(execution.exit_code, Some(0));
    assert_eq!(execution.exit_message.as_deref(), Some("COMPLETED"));

    // The repository holds the same terminal snapshot.
    let stored = repository
        .find_task_execution(execution.execution_id)
        .unwrap()
        .expect("execution should be stored");
    assert_eq!(stored, execution);
    assert!(repository.find_running_executions().unwrap().is_empty());

    assert_eq!(writer.len(), 5);
}

#[test]
fn failed_job_is_tracked_with_a_nonzero_exit_code() {
    let reader = FailingItemReader::new("boom");
    let writer: ListItemWriter<Record> = ListItemWriter::new();

    let job = SingleStepJobBuilder::new(&properties())
        .unwrap()
        .reader(&reader)
        .writer(&writer)
        .build()
        .unwrap();

    let repository = MapTaskRepository::new();
    let launcher = TaskJobLauncher::new(&repository);

    let result = launcher.launch(&job, &[]);
    assert!(result.is_err());

    let execution = repository
        .find_task_execution(1)
        .unwrap()
        .expect("execution should be stored");
    assert!(!execution.is_running());
    assert_eq!(execution.exit_code, Some(1));
    assert!(
        execution
            .exit_message
            .as_deref()
            .is_some_and(|message| message.contains("boom"))
    );
    assert!(writer.is_empty());
}
