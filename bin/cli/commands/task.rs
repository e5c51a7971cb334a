//! Tasks, submissions and reviews.

use anyhow::Result;
use clap::Subcommand;
use datadao::core::{Address, Task, TaskStatus, TaskType, Visibility};
use datadao::dao::CreateTaskParams;
use datadao::DaoClient;

use super::{format_time, label, parse_enum};
use crate::style::*;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task and escrow its rewards
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// data_collection, data_labeling, data_validation, data_curation or model_training
        #[arg(long, default_value = "data_labeling")]
        task_type: String,
        #[arg(long)]
        reward: u64,
        #[arg(long, default_value = "1")]
        review_reward: u64,
        #[arg(long, default_value = "1")]
        submissions: u32,
        #[arg(long, default_value = "1")]
        validations: u32,
        /// Hours until the deadline
        #[arg(long, default_value = "168")]
        hours: i64,
        #[arg(long)]
        content: Option<String>,
        /// Reviewer address allowed besides the creator (repeatable)
        #[arg(long = "reviewer")]
        reviewers: Vec<String>,
    },
    /// Show a task and its submissions
    Show { id: u64 },
    /// List tasks
    List {
        /// open, completed or closed
        #[arg(long)]
        status: Option<String>,
    },
    /// Add to the reward pool of an open task
    Fund {
        id: u64,
        #[arg(long)]
        amount: u64,
    },
    /// Close a task and refund its escrow
    Close { id: u64 },
}

pub async fn run(client: &DaoClient, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Create {
            title,
            description,
            task_type,
            reward,
            review_reward,
            submissions,
            validations,
            hours,
            content,
            reviewers,
        } => {
            let task_type: TaskType = parse_enum(&task_type)?;
            let nominated_reviewers = reviewers
                .iter()
                .map(|r| Address::parse(r).map_err(anyhow::Error::from))
                .collect::<Result<Vec<_>>>()?;
            let params = CreateTaskParams {
                title,
                description,
                task_type,
                reward_per_submission: reward,
                reward_per_review: review_reward,
                required_submissions: submissions,
                required_validations: validations,
                deadline: chrono::Utc::now().timestamp() + hours * 3600,
                visibility: Visibility::Public,
                access_conditions: None,
                content_reference: content,
                nominated_reviewers,
            };
            let task = client.create_task(&params).await?;
            print_success(&format!("Created task #{}", task.id));
            print_key_value("Escrowed", &task.escrowed.to_string());
            print_key_value("Deadline", &format_time(task.deadline));
            Ok(())
        }
        TaskCommand::Show { id } => {
            let task = client.get_task(id).await?;
            print_task(&task);
            let submissions = client.submissions_for_task(id).await?;
            if !submissions.is_empty() {
                print_section("Submissions");
                for s in submissions {
                    let status = s.status.as_str();
                    println!(
                        "  {} #{} {} {}{}{} {}",
                        icon_bullet(),
                        s.id,
                        style_dim(s.submitter.as_str()),
                        status_color(status),
                        status,
                        colors::RESET,
                        style_dim(&format!("+{} / -{}", s.approvals, s.rejections)),
                    );
                }
            }
            println!();
            Ok(())
        }
        TaskCommand::List { status } => {
            let status = status.as_deref().map(parse_enum::<TaskStatus>).transpose()?;
            let tasks = client.list_tasks(status).await?;
            if tasks.is_empty() {
                print_info("No tasks found");
                return Ok(());
            }
            print_header("Tasks");
            for t in tasks {
                let status = t.status.as_str();
                println!(
                    "  #{:<4} {}{:<9}{} {} {}",
                    t.id,
                    status_color(status),
                    status,
                    colors::RESET,
                    style_bold(&t.title),
                    style_dim(&format!(
                        "{}/{} approved, {} per submission",
                        t.approved_count, t.required_submissions, t.reward_per_submission
                    )),
                );
            }
            println!();
            Ok(())
        }
        TaskCommand::Fund { id, amount } => {
            let task = client.fund_task(id, amount).await?;
            print_success(&format!("Funded task #{}", task.id));
            print_key_value("Escrowed", &task.escrowed.to_string());
            Ok(())
        }
        TaskCommand::Close { id } => {
            let task = client.close_task(id).await?;
            print_success(&format!("Closed task #{}", task.id));
            Ok(())
        }
    }
}

fn print_task(task: &Task) {
    print_header(&format!("Task #{}", task.id));
    print_key_value("Title", &task.title);
    if !task.description.is_empty() {
        print_key_value("Description", &task.description);
    }
    print_key_value("Type", &label(&task.task_type));
    print_key_value("Creator", task.creator.as_str());
    let status = task.status.as_str();
    print_key_value_colored("Status", status, status_color(status));
    print_key_value(
        "Rewards",
        &format!(
            "{} per submission, {} per review",
            task.reward_per_submission, task.reward_per_review
        ),
    );
    print_key_value("Deadline", &format_time(task.deadline));
    if let Some(content) = &task.content_reference {
        print_key_value("Content", content);
    }
    print_key_value(
        "Progress",
        &format!(
            "{} {}/{}",
            progress_bar(
                task.approved_count as u64,
                task.required_submissions as u64,
                20
            ),
            task.approved_count,
            task.required_submissions
        ),
    );
}

pub async fn submit(
    client: &DaoClient,
    task_id: u64,
    content_reference: &str,
    encrypted: bool,
) -> Result<()> {
    let submission = client.submit(task_id, content_reference, encrypted).await?;
    print_success(&format!(
        "Submitted #{} to task #{}",
        submission.id, submission.task_id
    ));
    print_key_value("Content key", &submission.content_key.to_string());
    Ok(())
}

pub async fn review(
    client: &DaoClient,
    submission_id: u64,
    approved: bool,
    feedback: Option<&str>,
) -> Result<()> {
    let outcome = client.review(submission_id, approved, feedback).await?;
    let verdict = if approved { "approved" } else { "rejected" };
    print_success(&format!(
        "Review #{} recorded: {}",
        outcome.review.id, verdict
    ));
    print_key_value("Reward paid", &outcome.review.reward_paid.to_string());
    let status = outcome.submission.status.as_str();
    print_key_value_colored("Submission", status, status_color(status));
    let task_status = outcome.task.status.as_str();
    print_key_value_colored("Task", task_status, status_color(task_status));
    Ok(())
}
