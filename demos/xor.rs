use ffnet::{
    Activator, BatchSize, GradientDescent, Logging, Network, NetworkObjective, ObjectiveConfig,
    Parallelism, StopCondition,
};
use ndarray::array;

fn main() -> ffnet::Result<()> {
    tracing_subscriber::fmt::init();

    let x = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
    let y = array![[0.0, 1.0, 1.0, 0.0], [1.0, 0.0, 0.0, 1.0]];

    let network = Network::with_sizes(Activator::Sigmoid, &[2, 3, 2])?;
    let config = ObjectiveConfig {
        lambda: 0.0,
        batch_size: BatchSize::Full,
        parallelism: Parallelism::Workers(2),
    };
    let mut objective = NetworkObjective::with_config(network, x.clone(), y, &config)?;

    let trajectory = GradientDescent::new()
        .learning_rate(3.0)
        .logging(Logging::Iterations(250))
        .stop_condition(StopCondition::Iterations(2000))
        .optimize(&mut objective);

    let mut network = objective.into_network();
    network.set_all_weights(trajectory.parameters.view());
    println!();
    println!("{:.3}", network.forward_propagate(x.view()));
    Ok(())
}
