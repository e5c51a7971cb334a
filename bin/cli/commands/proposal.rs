//! Governance proposals.

use anyhow::Result;
use clap::Subcommand;
use datadao::api::routes::governance::ProposalView;
use datadao::core::{ProposalType, VoteSupport};
use datadao::dao::ProposalParams;
use datadao::DaoClient;

use super::{format_time, label, parse_enum};
use crate::style::*;

#[derive(Subcommand, Debug)]
pub enum ProposalCommand {
    /// Open a proposal (needs the minimum stake)
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// general, task_creation, dataset_validation, membership_rule, treasury or contract_upgrade
        #[arg(long, default_value = "general")]
        proposal_type: String,
    },
    /// Show a proposal and its tally
    Show { id: u64 },
    /// Vote with your current stake
    Vote {
        id: u64,
        /// for, against or abstain
        support: String,
    },
    /// Execute a proposal after its voting window
    Execute { id: u64 },
}

pub async fn run(client: &DaoClient, command: ProposalCommand) -> Result<()> {
    match command {
        ProposalCommand::Create {
            title,
            description,
            proposal_type,
        } => {
            let proposal_type: ProposalType = parse_enum(&proposal_type)?;
            let params = ProposalParams {
                title,
                description,
                proposal_type,
                calls: Vec::new(),
            };
            let view = client.create_proposal(&params).await?;
            print_success(&format!("Created proposal #{}", view.proposal.id));
            print_key_value("Voting opens", &format_time(view.proposal.start_time));
            print_key_value("Voting closes", &format_time(view.proposal.end_time));
            Ok(())
        }
        ProposalCommand::Show { id } => {
            let view = client.get_proposal(id).await?;
            print_proposal(&view);
            Ok(())
        }
        ProposalCommand::Vote { id, support } => {
            let support: VoteSupport = parse_enum(&support)?;
            let view = client.vote(id, support).await?;
            print_success(&format!(
                "Voted {} on proposal #{}",
                label(&support),
                view.proposal.id
            ));
            print_tally(&view);
            Ok(())
        }
        ProposalCommand::Execute { id } => {
            let view = client.execute_proposal(id).await?;
            if view.proposal.passed {
                print_success(&format!("Proposal #{} passed and was executed", id));
            } else {
                print_info(&format!("Proposal #{} did not pass", id));
            }
            print_tally(&view);
            Ok(())
        }
    }
}

fn print_proposal(view: &ProposalView) {
    let p = &view.proposal;
    print_header(&format!("Proposal #{}", p.id));
    print_key_value("Title", &p.title);
    if !p.description.is_empty() {
        print_key_value("Description", &p.description);
    }
    print_key_value("Type", &label(&p.proposal_type));
    print_key_value("Proposer", p.proposer.as_str());
    let status = label(&view.status);
    print_key_value_colored("Status", &status, status_color(&status));
    print_key_value(
        "Window",
        &format!("{} to {}", format_time(p.start_time), format_time(p.end_time)),
    );
    print_tally(view);
    println!();
}

fn print_tally(view: &ProposalView) {
    let p = &view.proposal;
    let total = p.yes_votes + p.no_votes + p.abstain_votes;
    print_section("Tally");
    println!("  {:<8} {} {}", "For", progress_bar(p.yes_votes, total, 20), p.yes_votes);
    println!("  {:<8} {} {}", "Against", progress_bar(p.no_votes, total, 20), p.no_votes);
    println!("  {:<8} {} {}", "Abstain", progress_bar(p.abstain_votes, total, 20), p.abstain_votes);
    print_key_value("Voters", &p.votes.len().to_string());
}
