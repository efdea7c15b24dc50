mod dynamics;
mod propagators;
